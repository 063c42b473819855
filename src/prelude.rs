//! Convenience re-exports for common use.

pub use crate::auth::{
    ApiRequest, AuthCheck, AuthGateway, AuthStack, Credentials, SessionResolver, TokenPair,
    TokenStore, UserProfile,
};
pub use crate::config::ApiConfig;
pub use crate::error::{ApiError, FailureClass, Result};
pub use crate::workflow::{
    Navigator, PagesWorkflow, StartAt, WorkflowControls, WorkflowDefinition, WorkflowEvent,
    WorkflowEventBus, WorkflowState, WorkflowStep,
};

//! Multi-step guided flows: event bus, step definitions, engine.

pub mod bus;
pub mod engine;
pub mod navigator;
pub mod step;

pub use bus::{EventSource, Subscription, WorkflowEvent, WorkflowEventBus};
pub use engine::{
    PagesWorkflow, WorkflowControls, WorkflowDefinition, WorkflowError, WorkflowState, EVENT_BACK,
    EVENT_EXIT, EVENT_NEXT,
};
pub use navigator::Navigator;
pub use step::{HookError, StartAt, StepView, WorkflowStep};

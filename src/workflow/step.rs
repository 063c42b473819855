use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::bus::WorkflowEvent;
use super::engine::WorkflowControls;

/// Error type for caller-supplied hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Per-step async setup, run while the engine shows `StepInitializing`.
pub type StepInitializer =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

/// Resolves where a mounted workflow starts. `None` means the first step.
pub type InitialStepResolver =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Option<StartAt>, HookError>> + Send + Sync>;

/// Invoked before the engine advances from one step to the next — the place
/// to persist progress server-side.
pub type AdvanceHook = Arc<dyn Fn(usize, usize) -> BoxFuture<'static, ()> + Send + Sync>;

/// Invoked when the workflow exits before navigating away.
pub type ExitHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// First look at every pumped event. Returning `true` marks the event
/// handled and stops the engine's own interpretation.
pub type EventInterceptor =
    Arc<dyn Fn(WorkflowEvent, WorkflowControls) -> BoxFuture<'static, bool> + Send + Sync>;

/// Where to start a mounted workflow. Numeric values are clamped into the
/// step range; an unknown id falls back to the first step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartAt {
    Index(i64),
    Id(String),
}

/// One step of a guided flow: a stable id plus optional async setup.
/// Immutable once handed to the engine; ordering comes from the caller.
#[derive(Clone)]
pub struct WorkflowStep {
    pub id: String,
    pub(crate) initializer: Option<StepInitializer>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initializer: None,
        }
    }

    /// Attach setup that runs each time the step becomes active.
    pub fn with_initializer<F, Fut>(mut self, initializer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.initializer = Some(Arc::new(move || initializer().boxed()));
        self
    }
}

impl fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("id", &self.id)
            .field("initializer", &self.initializer.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Snapshot of the active step handed to the rendering layer. Carries
/// everything a step needs without exposing the engine's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub id: String,
    pub index: usize,
    pub total: usize,
    pub initializing: bool,
}

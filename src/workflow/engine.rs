use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::FutureExt;
use thiserror::Error;
use tokio::sync::mpsc;

use super::bus::{Subscription, WorkflowEvent, WorkflowEventBus};
use super::navigator::Navigator;
use super::step::{
    AdvanceHook, EventInterceptor, ExitHook, HookError, InitialStepResolver, StartAt, StepView,
    WorkflowStep,
};

/// Built-in event name advancing to the next step.
pub const EVENT_NEXT: &str = "next";
/// Built-in event name stepping back.
pub const EVENT_BACK: &str = "back";
/// Built-in event name leaving the workflow.
pub const EVENT_EXIT: &str = "exit";

/// Engine errors. Step initializers failing is not one of them — that is
/// logged and navigation continues.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No steps supplied to workflow")]
    Empty,
    #[error("Initial step resolution failed: {0}")]
    ResolveFailed(String),
}

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Mounted, waiting for the initial-step resolver.
    ResolvingInitialStep,
    /// A step is active.
    StepActive(usize),
    /// A step is active and its initializer is still running.
    StepInitializing(usize),
    /// The workflow navigated away; the engine is inert.
    Exited,
}

/// Caller-assembled description of a workflow: ordered steps, navigation
/// targets, and optional hooks.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use vitrine::workflow::{
///     Navigator, PagesWorkflow, StartAt, WorkflowDefinition, WorkflowStep,
/// };
///
/// # fn demo(navigator: Arc<dyn Navigator>) {
/// let definition = WorkflowDefinition::new("/seller")
///     .step(WorkflowStep::new("email"))
///     .step(WorkflowStep::new("agreements"))
///     .step(WorkflowStep::new("data"))
///     .with_initial_step_resolver(|| async {
///         Ok(Some(StartAt::Id("agreements".to_string())))
///     });
/// let workflow = PagesWorkflow::mount(definition, navigator);
/// # }
/// ```
pub struct WorkflowDefinition {
    steps: Vec<WorkflowStep>,
    exit_to: String,
    first_step_back_to: Option<String>,
    resolve_initial: Option<InitialStepResolver>,
    on_advance: Option<AdvanceHook>,
    on_exit: Option<ExitHook>,
    interceptor: Option<EventInterceptor>,
}

impl WorkflowDefinition {
    pub fn new(exit_to: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            exit_to: exit_to.into(),
            first_step_back_to: None,
            resolve_initial: None,
            on_advance: None,
            on_exit: None,
            interceptor: None,
        }
    }

    /// Append a step. Order of calls is step order.
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Where `back` on the first step navigates instead of popping history.
    pub fn with_first_step_back_to(mut self, target: impl Into<String>) -> Self {
        self.first_step_back_to = Some(target.into());
        self
    }

    /// Resolve the starting step at mount time — e.g. from a server-side
    /// onboarding record. Errors leave the workflow unresolved; resolvers
    /// are expected not to fail.
    pub fn with_initial_step_resolver<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<StartAt>, HookError>> + Send + 'static,
    {
        self.resolve_initial = Some(Arc::new(move || resolver().boxed()));
        self
    }

    /// Hook run before each forward step change, with (from, to) indices.
    pub fn with_on_advance<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(usize, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_advance = Some(Arc::new(move |from, to| hook(from, to).boxed()));
        self
    }

    /// Hook run on explicit exit, before navigating away.
    pub fn with_on_exit<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_exit = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// First look at every pumped event; return `true` to mark it handled
    /// and suppress the engine's own `next`/`back`/`exit` interpretation.
    pub fn with_event_interceptor<F, Fut>(mut self, interceptor: F) -> Self
    where
        F: Fn(WorkflowEvent, WorkflowControls) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.interceptor = Some(Arc::new(move |event, controls| {
            interceptor(event, controls).boxed()
        }));
        self
    }
}

/// Bound navigation controls handed to steps and interceptors. Cheap to
/// clone; steps stay agnostic of the engine's index bookkeeping.
#[derive(Clone)]
pub struct WorkflowControls {
    inner: Arc<EngineInner>,
}

impl WorkflowControls {
    /// Advance one step; on the last step this exits the workflow.
    pub async fn next(&self) {
        self.inner.next().await;
    }

    /// Step back, or leave the workflow from the first step.
    pub async fn back(&self) {
        self.inner.back().await;
    }

    /// Leave the workflow toward `target`, or the default exit target.
    pub async fn exit(&self, target: Option<&str>) {
        self.inner.exit(target).await;
    }

    /// Emit an event on the workflow bus, stamped with the active step.
    pub fn emit(&self, name: impl Into<String>, payload: serde_json::Value) {
        self.inner.emit(name.into(), payload);
    }
}

/// Sequential/branching state machine driving a named multi-step flow.
///
/// Mounting wires a fresh bus and the engine's own catch-all subscription;
/// events are queued and interpreted by [`run`](Self::run) or
/// [`tick`](Self::tick), so a listener emitting from inside a dispatch
/// enqueues instead of recursing. [`start`](Self::start) resolves the
/// initial step; after that, steps drive navigation by emitting `next`,
/// `back`, and `exit` (or through [`WorkflowControls`] directly).
pub struct PagesWorkflow {
    inner: Arc<EngineInner>,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<WorkflowEvent>>,
    _pump_subscription: Subscription,
}

impl PagesWorkflow {
    /// Create the engine over an injected host navigator. No steps run until
    /// [`start`](Self::start).
    pub fn mount(definition: WorkflowDefinition, navigator: Arc<dyn Navigator>) -> Self {
        let bus = Arc::new(WorkflowEventBus::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let pump_subscription = bus.on_any(move |event: &WorkflowEvent| {
            // Deferred dispatch: enqueue and let run()/tick() interpret.
            let _ = tx.send(event.clone());
        });

        let inner = Arc::new(EngineInner {
            steps: definition.steps,
            exit_to: definition.exit_to,
            first_step_back_to: definition.first_step_back_to,
            resolve_initial: definition.resolve_initial,
            on_advance: definition.on_advance,
            on_exit: definition.on_exit,
            interceptor: definition.interceptor,
            bus,
            navigator,
            state: Mutex::new(WorkflowState::ResolvingInitialStep),
            epoch: AtomicU64::new(0),
        });

        Self {
            inner,
            events: tokio::sync::Mutex::new(rx),
            _pump_subscription: pump_subscription,
        }
    }

    /// Resolve the starting step and activate it.
    ///
    /// A resolver failure leaves the engine in `ResolvingInitialStep` and is
    /// returned to the caller — resolvers are a caller obligation, the
    /// engine does not recover from them.
    pub async fn start(&self) -> Result<(), WorkflowError> {
        if self.inner.steps.is_empty() {
            return Err(WorkflowError::Empty);
        }
        let index = match &self.inner.resolve_initial {
            None => 0,
            Some(resolver) => match resolver().await {
                Ok(start_at) => self.inner.resolve_index(start_at),
                Err(err) => return Err(WorkflowError::ResolveFailed(err.to_string())),
            },
        };
        self.inner.enter_step(index).await;
        Ok(())
    }

    /// Interpret queued bus events until the workflow exits.
    pub async fn run(&self) {
        let mut events = self.events.lock().await;
        while self.inner.state() != WorkflowState::Exited {
            match events.recv().await {
                Some(event) => EngineInner::dispatch(&self.inner, event).await,
                None => break,
            }
        }
    }

    /// Interpret the events queued so far, without blocking. Returns the
    /// number of events processed.
    pub async fn tick(&self) -> usize {
        let mut events = self.events.lock().await;
        let mut processed = 0;
        while self.inner.state() != WorkflowState::Exited {
            match events.try_recv() {
                Ok(event) => {
                    EngineInner::dispatch(&self.inner, event).await;
                    processed += 1;
                }
                Err(_) => break,
            }
        }
        processed
    }

    /// Observable engine state.
    pub fn state(&self) -> WorkflowState {
        self.inner.state()
    }

    /// Snapshot of the active step for the rendering layer.
    pub fn current(&self) -> Option<StepView> {
        let (index, initializing) = match self.inner.state() {
            WorkflowState::StepActive(index) => (index, false),
            WorkflowState::StepInitializing(index) => (index, true),
            _ => return None,
        };
        self.inner.steps.get(index).map(|step| StepView {
            id: step.id.clone(),
            index,
            total: self.inner.steps.len(),
            initializing,
        })
    }

    /// The workflow's bus, for steps registering their own listeners.
    pub fn bus(&self) -> Arc<WorkflowEventBus> {
        self.inner.bus.clone()
    }

    /// Bound controls for the active step.
    pub fn controls(&self) -> WorkflowControls {
        WorkflowControls {
            inner: self.inner.clone(),
        }
    }
}

struct EngineInner {
    steps: Vec<WorkflowStep>,
    exit_to: String,
    first_step_back_to: Option<String>,
    resolve_initial: Option<InitialStepResolver>,
    on_advance: Option<AdvanceHook>,
    on_exit: Option<ExitHook>,
    interceptor: Option<EventInterceptor>,
    bus: Arc<WorkflowEventBus>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<WorkflowState>,
    epoch: AtomicU64,
}

impl EngineInner {
    fn state(&self) -> WorkflowState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(WorkflowState::Exited)
    }

    fn set_state(&self, state: WorkflowState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    fn active_index(&self) -> Option<usize> {
        match self.state() {
            WorkflowState::StepActive(index) | WorkflowState::StepInitializing(index) => {
                Some(index)
            }
            _ => None,
        }
    }

    /// Map a resolver result onto a valid step index: numbers clamp into
    /// range, unknown ids fall back to the first step.
    fn resolve_index(&self, start_at: Option<StartAt>) -> usize {
        let last = self.steps.len() - 1;
        match start_at {
            None => 0,
            Some(StartAt::Index(index)) => index.clamp(0, last as i64) as usize,
            Some(StartAt::Id(id)) => {
                match self.steps.iter().position(|step| step.id == id) {
                    Some(index) => index,
                    None => {
                        tracing::warn!(step_id = %id, "unknown initial step id, starting at 0");
                        0
                    }
                }
            }
        }
    }

    /// Activate a step and run its initializer, if any. A stale initializer
    /// (the index moved again while it ran) must not clobber the newer
    /// step's state, hence the epoch guard.
    async fn enter_step(&self, index: usize) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(WorkflowState::StepActive(index));

        let Some(initializer) = self
            .steps
            .get(index)
            .and_then(|step| step.initializer.clone())
        else {
            return;
        };

        self.set_state(WorkflowState::StepInitializing(index));
        let result = initializer().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        if let Err(err) = result {
            // Best-effort setup: never fatal to navigation.
            let step_id = self.steps.get(index).map(|s| s.id.as_str()).unwrap_or("");
            tracing::warn!(step = step_id, error = %err, "step initializer failed");
        }
        self.set_state(WorkflowState::StepActive(index));
    }

    async fn next(&self) {
        let Some(index) = self.active_index() else {
            tracing::debug!("next ignored outside an active step");
            return;
        };
        if index + 1 >= self.steps.len() {
            self.exit(None).await;
            return;
        }
        if let Some(hook) = &self.on_advance {
            hook(index, index + 1).await;
        }
        self.enter_step(index + 1).await;
    }

    async fn back(&self) {
        let Some(index) = self.active_index() else {
            tracing::debug!("back ignored outside an active step");
            return;
        };
        if index > 0 {
            self.enter_step(index - 1).await;
            return;
        }
        // Leaving from the first step: explicit target, else host history,
        // else the exit target. No on_exit hook on this path.
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.set_state(WorkflowState::Exited);
        if let Some(target) = &self.first_step_back_to {
            self.navigator.replace(target);
        } else if self.navigator.can_go_back() {
            self.navigator.back();
        } else {
            self.navigator.replace(&self.exit_to);
        }
    }

    async fn exit(&self, target: Option<&str>) {
        if self.state() == WorkflowState::Exited {
            return;
        }
        if let Some(hook) = &self.on_exit {
            hook().await;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.set_state(WorkflowState::Exited);
        self.navigator.replace(target.unwrap_or(&self.exit_to));
    }

    fn emit(&self, name: String, payload: serde_json::Value) {
        let mut event = WorkflowEvent::new(name, payload);
        if let Some(index) = self.active_index() {
            if let Some(step) = self.steps.get(index) {
                event = event.with_source(step.id.clone(), index);
            }
        }
        self.bus.emit(event);
    }

    async fn dispatch(inner: &Arc<Self>, event: WorkflowEvent) {
        if let Some(interceptor) = &inner.interceptor {
            let controls = WorkflowControls {
                inner: inner.clone(),
            };
            if interceptor(event.clone(), controls).await {
                return;
            }
        }
        match event.name.as_str() {
            EVENT_NEXT => inner.next().await,
            EVENT_BACK => inner.back().await,
            EVENT_EXIT => inner.exit(None).await,
            // Unrecognized names are for the steps' own listeners.
            _ => {}
        }
    }
}

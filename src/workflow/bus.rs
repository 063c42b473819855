use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Which step produced an event. Events emitted from outside any step
/// (host code, tests driving the bus directly) carry no source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSource {
    pub step_id: String,
    pub step_index: usize,
}

/// One event on a workflow's bus. Ephemeral: exists for the duration of a
/// single dispatch, no queuing or replay.
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub name: String,
    pub payload: serde_json::Value,
    pub source: Option<EventSource>,
}

impl WorkflowEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            source: None,
        }
    }

    /// An event with no payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, serde_json::Value::Null)
    }

    pub fn with_source(mut self, step_id: impl Into<String>, step_index: usize) -> Self {
        self.source = Some(EventSource {
            step_id: step_id.into(),
            step_index,
        });
        self
    }
}

type Listener = Arc<dyn Fn(&WorkflowEvent) + Send + Sync>;

struct NamedListener {
    id: u64,
    name: String,
    listener: Listener,
}

struct AnyListener {
    id: u64,
    listener: Listener,
}

/// In-process publish/subscribe channel scoped to one workflow instance.
///
/// `emit` fans out synchronously: listeners registered for the event's name
/// first, in registration order, then the catch-all listeners. A panicking
/// listener is caught and logged; it never stops the remaining listeners.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use vitrine::workflow::{WorkflowEvent, WorkflowEventBus};
///
/// let bus = WorkflowEventBus::new();
/// let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let sub = bus.on("next", move |event| {
///     sink.lock().unwrap().push(event.name.clone());
/// });
/// bus.emit(WorkflowEvent::named("next"));
/// sub.cancel();
/// assert_eq!(seen.lock().unwrap().as_slice(), ["next"]);
/// ```
pub struct WorkflowEventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    named: Mutex<Vec<NamedListener>>,
    any: Mutex<Vec<AnyListener>>,
    next_id: AtomicU64,
}

impl Default for WorkflowEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                named: Mutex::new(Vec::new()),
                any: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener for one named event. The returned subscription is
    /// the disposer; dropping it without calling `cancel` leaves the
    /// listener registered.
    pub fn on(
        &self,
        name: impl Into<String>,
        listener: impl Fn(&WorkflowEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.named.lock() {
            listeners.push(NamedListener {
                id,
                name: name.into(),
                listener: Arc::new(listener),
            });
        }
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Register a listener invoked for every event, after the name-specific
    /// listeners of that event.
    pub fn on_any(
        &self,
        listener: impl Fn(&WorkflowEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.any.lock() {
            listeners.push(AnyListener {
                id,
                listener: Arc::new(listener),
            });
        }
        Subscription {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Synchronous fan-out. Emits with no registered listeners are dropped.
    pub fn emit(&self, event: WorkflowEvent) {
        let named: Vec<Listener> = self
            .inner
            .named
            .lock()
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|entry| entry.name == event.name)
                    .map(|entry| entry.listener.clone())
                    .collect()
            })
            .unwrap_or_default();
        let any: Vec<Listener> = self
            .inner
            .any
            .lock()
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|entry| entry.listener.clone())
                    .collect()
            })
            .unwrap_or_default();

        for listener in named.into_iter().chain(any) {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                let detail = panic_message(&panic);
                tracing::error!(event = %event.name, panic = %detail, "event listener panicked");
            }
        }
    }
}

/// Disposer handle returned by [`WorkflowEventBus::on`]/[`on_any`](WorkflowEventBus::on_any).
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Subscription {
    /// Remove the listener. A no-op if the bus is gone or the listener was
    /// already removed.
    pub fn cancel(&self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let named = bus.named.lock();
        if let Ok(mut listeners) = named {
            listeners.retain(|entry| entry.id != self.id);
        }
        let any = bus.any.lock();
        if let Ok(mut listeners) = any {
            listeners.retain(|entry| entry.id != self.id);
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

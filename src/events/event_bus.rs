//! Synchronous publish/subscribe keyed by event name.
//!
//! Handlers run on the emitting thread, in registration order, against a
//! snapshot of the handler list taken when `emit` starts. Registering or
//! removing handlers from inside a handler only affects later emissions.
//! A panicking handler is logged and skipped; the rest still run and the
//! emitter never sees the panic.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::dispose::{Disposer, HandlerId};

/// A bus handler. Receives the emitted payload.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone)]
struct HandlerEntry {
    id: HandlerId,
    handler: EventHandler,
}

#[derive(Default)]
struct BusInner {
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
}

impl BusInner {
    fn remove(&self, event: &str, handler_id: &HandlerId) -> bool {
        let mut map = self.handlers.write();
        let Some(entries) = map.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != *handler_id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            map.remove(event);
        }
        removed
    }
}

/// Cheaply cloneable handle to one bus; clones share handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn on(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Disposer {
        let event = event.into();
        let id = HandlerId::new(event.clone());
        self.inner
            .handlers
            .write()
            .entry(event.clone())
            .or_default()
            .push(HandlerEntry {
                id: id.clone(),
                handler: Arc::new(handler),
            });

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let release_id = id.clone();
        Disposer::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(&event, &release_id);
            }
        })
    }

    /// Remove a handler by id. Returns whether anything was removed.
    pub fn off(&self, event: &str, handler_id: &HandlerId) -> bool {
        self.inner.remove(event, handler_id)
    }

    /// Deliver `payload` to every handler registered for `event`.
    pub fn emit(&self, event: &str, payload: Value) {
        let entries: Vec<HandlerEntry> = match self.inner.handlers.read().get(event) {
            Some(entries) => entries.clone(),
            None => return,
        };

        for entry in &entries {
            let result = catch_unwind(AssertUnwindSafe(|| (entry.handler)(&payload)));
            if let Err(panic) = result {
                log::error!(
                    "[EventBus] handler {:?} for `{event}` panicked: {}",
                    entry.id,
                    panic_message(&panic)
                );
            }
        }
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.handlers.read().get(event).map_or(0, Vec::len)
    }

    /// Drop every handler for every event.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

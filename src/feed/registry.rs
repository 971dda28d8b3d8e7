//! Event handler registry
//!
//! Handlers are kept per event name in registration order. A `Subscription`
//! handle removes exactly the handler it was returned for.

use super::events::{FeedEvent, ANY};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Callback invoked for each matching event
pub type EventHandler = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

struct HandlerEntry {
    id: u64,
    event: String,
    handler: EventHandler,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<HandlerEntry>,
}

/// Shared handler registry
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a handler for `event` (`"*"` matches every event)
    pub fn register(&self, event: &str, handler: EventHandler) -> Subscription {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push(HandlerEntry {
            id,
            event: event.to_string(),
            handler,
        });

        tracing::trace!(event = %event, handler_id = id, "Registered feed handler");

        Subscription {
            id,
            event: event.to_string(),
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every matching handler, in registration order
    ///
    /// Handlers run without the registry lock held, so they may subscribe or
    /// unsubscribe. Returns the number of handlers invoked.
    pub fn emit(&self, event: &FeedEvent) -> usize {
        let name = event.name();
        let handlers: Vec<EventHandler> = {
            let inner = self.lock();
            inner
                .entries
                .iter()
                .filter(|entry| entry.event == name || entry.event == ANY)
                .map(|entry| Arc::clone(&entry.handler))
                .collect()
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers registered for exactly `event`
    pub fn handler_count(&self, event: &str) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| entry.event == event)
            .count()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

/// Handle returned by every subscribe call
///
/// Dropping the handle keeps the handler registered; call `unsubscribe` to
/// remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    event: String,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove this handler; returns false if it was already gone
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = inner.entries.len();
        inner.entries.retain(|entry| entry.id != self.id);
        before != inner.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn error_event() -> FeedEvent {
        FeedEvent::Error {
            channel: "transactions".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let registry = HandlerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            registry.register(
                "error",
                Arc::new(move |_: &FeedEvent| log.lock().unwrap().push(label)),
            );
        }

        assert_eq!(registry.emit(&error_event()), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let registry = HandlerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let a = {
            let hits = Arc::clone(&hits);
            registry.register("error", Arc::new(move |_: &FeedEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
            }))
        };
        let _b = {
            let hits = Arc::clone(&hits);
            registry.register("error", Arc::new(move |_: &FeedEvent| {
                hits.fetch_add(10, Ordering::SeqCst);
            }))
        };

        assert!(a.unsubscribe());
        registry.emit(&error_event());
        assert_eq!(hits.load(Ordering::SeqCst), 10);
        assert_eq!(registry.handler_count("error"), 1);
    }

    #[test]
    fn test_wildcard_and_name_matching() {
        let registry = HandlerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        {
            let hits = Arc::clone(&hits);
            registry.register(ANY, Arc::new(move |_: &FeedEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        registry.register("connect", Arc::new(|_: &FeedEvent| panic!("wrong event")));

        assert_eq!(registry.emit(&error_event()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_subscribe_during_emit() {
        let registry = HandlerRegistry::new();
        let inner = registry.clone();
        registry.register("error", Arc::new(move |_: &FeedEvent| {
            inner.register("error", Arc::new(|_: &FeedEvent| {}));
        }));

        registry.emit(&error_event());
        assert_eq!(registry.handler_count("error"), 2);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = HandlerRegistry::new();
        let sub = registry.register("error", Arc::new(|_: &FeedEvent| {}));
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}

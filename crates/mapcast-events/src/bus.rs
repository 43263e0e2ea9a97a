//! Synchronous, in-memory publish/subscribe.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::{DomainEvent, EventError, EventKind};

/// A registered event handler.
///
/// `Arc` rather than `Box` so one handler can be registered under several
/// kinds (see [`EventBus::subscribe_all`]).
pub type Subscriber = Arc<dyn Fn(&DomainEvent) -> Result<(), EventError> + Send + Sync>;

/// The process-wide publish point for [`DomainEvent`]s.
///
/// Subscribers are registered while the server is being built (`&mut self`)
/// and the bus is then shared read-only behind an `Arc`, so publishing
/// takes no lock.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for one event kind. Handlers for the same kind
    /// run in registration order.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&DomainEvent) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Registers one handler under every [`EventKind`].
    pub fn subscribe_all<F>(&mut self, handler: F)
    where
        F: Fn(&DomainEvent) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler: Subscriber = Arc::new(handler);
        for kind in EventKind::ALL {
            self.subscribers
                .entry(kind)
                .or_default()
                .push(Arc::clone(&handler));
        }
    }

    /// Appends every handler of `other` after this bus's own handlers,
    /// keeping `other`'s order within each kind.
    pub fn extend(&mut self, other: EventBus) {
        for (kind, handlers) in other.subscribers {
            self.subscribers.entry(kind).or_default().extend(handlers);
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Runs every subscriber for the event's kind on the calling task.
    ///
    /// Never fails and never panics on behalf of a subscriber: an `Err` or a
    /// panic from one handler is logged and the remaining handlers still run.
    pub fn publish(&self, event: DomainEvent) {
        let kind = event.kind();
        let Some(handlers) = self.subscribers.get(&kind) else {
            tracing::debug!(%kind, "event published with no subscribers");
            return;
        };

        for (index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(%kind, subscriber = index, error = %e, "event subscriber failed");
                }
                Err(_) => {
                    tracing::error!(%kind, subscriber = index, "event subscriber panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .subscribers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

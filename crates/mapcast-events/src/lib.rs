//! Domain events and the in-process bus that carries them.
//!
//! The HTTP handlers that mutate markers and layers live elsewhere. Once a
//! store write has succeeded they call [`EventBus::publish`] with a
//! [`DomainEvent`], and every subscriber for that event's [`EventKind`]
//! runs synchronously on the caller's task.
//!
//! ```text
//! CRUD handler ──publish──→ EventBus ──→ BroadcastDispatcher ──→ sessions
//! ```
//!
//! Publishing never fails from the caller's point of view: a subscriber
//! that returns an error or panics is logged and skipped, and the next
//! subscriber still runs.

mod bus;
mod error;
mod event;

pub use bus::{EventBus, Subscriber};
pub use error::EventError;
pub use event::{DomainEvent, EventKind};

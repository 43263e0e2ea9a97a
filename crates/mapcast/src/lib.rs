//! # Mapcast
//!
//! Real-time fan-out of map edits to connected browsers.
//!
//! CRUD handlers publish a [`DomainEvent`](mapcast_events::DomainEvent) on
//! the bus; the [`BroadcastDispatcher`] turns it into a pipe-delimited frame
//! and queues it on every live session that should see it. Browsers open a
//! WebSocket, optionally send `1|<token>` to bind to an account, and from
//! then on their presence is tracked in the identity store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapcast::prelude::*;
//!
//! # async fn start() -> Result<(), MapcastError> {
//! let store = Arc::new(MemoryIdentityStore::new());
//! let server = MapcastServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build(store)
//!     .await?;
//!
//! let events = server.publisher();
//! tokio::spawn(server.run());
//!
//! events.publish(DomainEvent::MarkerRemoved { id: "m1".into() });
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod error;
mod handler;
mod server;

pub use dispatcher::{Audience, BroadcastDispatcher};
pub use error::MapcastError;
pub use server::{DEFAULT_BIND_ADDR, MapcastServer, MapcastServerBuilder};

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{Audience, BroadcastDispatcher, MapcastError, MapcastServer, MapcastServerBuilder};
    pub use mapcast_events::{DomainEvent, EventBus, EventError, EventKind};
    pub use mapcast_protocol::{ActivityId, ClientMessage, Codec, Frame, PipeCodec, ServerMessage};
    pub use mapcast_session::{
        AuthOutcome, Email, Identity, IdentityStore, MemoryIdentityStore, PresenceState,
        SessionError, SessionRegistry, SessionState,
    };
    pub use mapcast_transport::ConnectionId;
}

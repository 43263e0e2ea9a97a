//! Session management for Mapcast.
//!
//! This crate tracks who is connected to the real-time channel:
//!
//! 1. **Registry**: every live connection and the account it is bound to,
//!    if any ([`SessionRegistry`])
//! 2. **Handshake**: resolving an `AUTH` token to an account and keeping
//!    that account's presence up to date ([`HandshakeHandler`])
//! 3. **Identity store**: the persistence collaborator the handshake reads
//!    and writes through ([`IdentityStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / dispatcher (above)  ← snapshots sessions to fan out frames
//!     ↕
//! Session layer (this crate)   ← who is connected, as whom
//!     ↕
//! Protocol / transport (below) ← Frame, ConnectionId
//! ```

mod error;
mod handshake;
mod identity;
mod registry;
mod session;

pub use error::SessionError;
pub use handshake::{AuthOutcome, HandshakeHandler};
pub use identity::{Email, Identity, IdentityStore, MemoryIdentityStore, PresenceState};
pub use registry::SessionRegistry;
pub use session::{OUTBOUND_QUEUE_CAPACITY, Session, SessionSender, SessionState, outbound_queue};

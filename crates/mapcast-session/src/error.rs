//! Error types for the session layer.

use mapcast_transport::ConnectionId;

/// Errors that can occur while tracking sessions.
///
/// None of these reach a client or an HTTP caller; the server logs them
/// and carries on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session with this connection id is already registered.
    #[error("session {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No live session exists for this connection id. Usually the
    /// connection closed while something else was in flight.
    #[error("session {0} not found")]
    NotFound(ConnectionId),

    /// The session's writer has gone away, so the frame was dropped.
    #[error("session {0} is no longer accepting frames")]
    SendFailed(ConnectionId),

    /// The session's outbound queue is full because its client stopped
    /// reading. The frame was dropped.
    #[error("session {0} outbound queue is full")]
    QueueFull(ConnectionId),

    /// The identity store could not complete a lookup or save.
    #[error("identity store error: {0}")]
    Store(String),
}

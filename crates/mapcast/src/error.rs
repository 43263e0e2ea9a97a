//! Unified error type for the Mapcast server.

use mapcast_session::SessionError;
use mapcast_transport::TransportError;

/// Top-level error that wraps the transport and session errors.
///
/// Only the server's setup and per-connection plumbing return this. The
/// publish path never does: broadcasting and presence are best effort.
/// Frames the codec cannot read are logged and dropped by the connection
/// handler, so protocol errors never surface here.
#[derive(Debug, thiserror::Error)]
pub enum MapcastError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session-level error (registry or store).
    #[error(transparent)]
    Session(#[from] SessionError),
}

//! Error types for the protocol layer.
//!
//! None of these are ever reported back to the client: the connection
//! handler logs them at debug level and drops the frame.

use crate::ActivityId;

/// Why an inbound frame could not be turned into a [`ClientMessage`](crate::ClientMessage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    /// The first field is empty, non-numeric, zero, or not a known code.
    #[error("unknown activity code: {0:?}")]
    UnknownActivity(String),

    /// The code is known but only valid in the server → client direction.
    #[error("activity {0} is not accepted from clients")]
    UnsupportedActivity(ActivityId),

    /// The activity is recognised but a required field is missing or empty.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

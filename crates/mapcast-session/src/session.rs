//! Session types: the server's record of one live connection.
//!
//! A session tracks:
//! - WHICH connection it is (`ConnectionId`)
//! - WHO, if anyone, is signed in on it (`SessionState`)
//! - WHERE to put outbound frames (`SessionSender`)

use mapcast_protocol::Frame;
use mapcast_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::{Email, SessionError};

/// How many frames may wait for one session's writer before new frames
/// for that session are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// The queue a session's writer task drains onto its connection.
///
/// Bounded and pushed with `try_send`: the broadcast path runs
/// synchronously inside the publisher's call and must never wait on a
/// client that has stopped reading.
pub type SessionSender = mpsc::Sender<Frame>;

/// Creates the outbound queue for one session, sized
/// [`OUTBOUND_QUEUE_CAPACITY`].
pub fn outbound_queue() -> (SessionSender, mpsc::Receiver<Frame>) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Authentication state of a session.
///
/// ```text
///   Anonymous ──(AUTH frame)──→ Authenticating ──(token found)──→ Authenticated
///       ↑                              │
///       └───────(token unknown)────────┘
/// ```
///
/// There is no transition out of `Authenticated` other than closing the
/// connection. A later AUTH frame re-binds in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Read-only viewer; receives every broadcast.
    #[default]
    Anonymous,

    /// A token lookup is in flight.
    Authenticating,

    /// Bound to an account.
    Authenticated(Email),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One live real-time connection.
///
/// Cloning is cheap (the sender is a channel handle); the registry hands
/// out clones as point-in-time snapshots.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    state: SessionState,
    sender: SessionSender,
}

impl Session {
    pub(crate) fn new(id: ConnectionId, sender: SessionSender) -> Self {
        Self {
            id,
            state: SessionState::Anonymous,
            sender,
        }
    }

    /// The connection this session belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current authentication state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The bound account, if the handshake has succeeded.
    pub fn identity(&self) -> Option<&Email> {
        match &self.state {
            SessionState::Authenticated(email) => Some(email),
            _ => None,
        }
    }

    /// Returns `true` once bound to an account.
    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Queues a frame for this session's writer without waiting.
    ///
    /// # Errors
    /// - [`SessionError::QueueFull`] if the client is not keeping up; the
    ///   frame is dropped.
    /// - [`SessionError::SendFailed`] if the writer task has already
    ///   exited, i.e. the connection is closing.
    pub fn send(&self, frame: Frame) -> Result<(), SessionError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::QueueFull(self.id),
            mpsc::error::TrySendError::Closed(_) => SessionError::SendFailed(self.id),
        })
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

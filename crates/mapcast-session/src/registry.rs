//! The session registry: every live connection in the process.
//!
//! Connection tasks register and unregister concurrently while the
//! broadcast dispatcher iterates, so every operation takes the same lock.
//! It is a `std::sync::Mutex`, not a Tokio one: the critical sections are a
//! few map operations, nothing awaits while holding it, and the dispatcher
//! runs synchronously inside `EventBus::publish`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mapcast_transport::ConnectionId;

use crate::{Email, Session, SessionError, SessionSender, SessionState};

/// Tracks every live [`Session`], keyed by connection id.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ begin_authentication() ──→ bind() ──→ unregister()
///     │                    │                               ↑
///     │                    └──→ reset_authentication() ────┤
///     └────────────────────────────────────────────────────┘
/// ```
///
/// Constructed once by the server and shared as `Arc<SessionRegistry>`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic elsewhere while holding the lock leaves the map itself
    /// consistent (every operation is a single insert/remove/assign), so a
    /// poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a new anonymous session. It is visible to broadcasts as soon as
    /// this returns.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if `id` is already live.
    pub fn register(
        &self,
        id: ConnectionId,
        sender: SessionSender,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.lock();
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyRegistered(id));
        }
        let session = Session::new(id, sender);
        sessions.insert(id, session.clone());
        tracing::debug!(conn_id = %id, live = sessions.len(), "session registered");
        Ok(session)
    }

    /// Marks a token lookup as in flight. An already-bound session keeps
    /// its identity while it re-authenticates.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session has closed.
    pub fn begin_authentication(&self, id: ConnectionId) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if matches!(session.state(), SessionState::Anonymous) {
            session.set_state(SessionState::Authenticating);
        }
        Ok(())
    }

    /// Returns an `Authenticating` session to `Anonymous` after a failed
    /// lookup. Bound sessions and closed sessions are left alone.
    pub fn reset_authentication(&self, id: ConnectionId) {
        if let Some(session) = self.lock().get_mut(&id) {
            if matches!(session.state(), SessionState::Authenticating) {
                session.set_state(SessionState::Anonymous);
            }
        }
    }

    /// Binds the session to an account. A second call overwrites the
    /// first; there is no separate re-authentication path.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session closed during the lookup.
    pub fn bind(&self, id: ConnectionId, email: Email) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.set_state(SessionState::Authenticated(email));
        Ok(())
    }

    /// Removes the session and returns its final state. Called once, from
    /// the connection's close path; later calls return `None`.
    pub fn unregister(&self, id: ConnectionId) -> Option<Session> {
        let mut sessions = self.lock();
        let removed = sessions.remove(&id);
        if removed.is_some() {
            tracing::debug!(conn_id = %id, live = sessions.len(), "session unregistered");
        }
        removed
    }

    /// A point-in-time copy of every live session.
    ///
    /// The lock is released before this returns, so callers may send to the
    /// snapshot while other connections open and close.
    pub fn all_sessions(&self) -> Vec<Session> {
        self.lock().values().cloned().collect()
    }

    /// A copy of one session.
    pub fn get(&self, id: ConnectionId) -> Option<Session> {
        self.lock().get(&id).cloned()
    }

    /// The account a session is bound to, if any.
    pub fn identity_of(&self, id: ConnectionId) -> Option<Email> {
        self.lock()
            .get(&id)
            .and_then(|session| session.identity().cloned())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

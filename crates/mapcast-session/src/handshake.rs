//! The AUTH handshake and presence bookkeeping.
//!
//! A browser that has signed in over HTTP sends `1|<token>` once its
//! socket opens. The handler resolves the token through the
//! [`IdentityStore`], binds the session, and marks the account online.
//! When the socket closes it marks the account offline again.
//!
//! Everything here is best effort. An unknown token, a store outage or a
//! connection that closed mid-lookup leave the session as it was, and no
//! reply is ever written back to the client.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mapcast_transport::ConnectionId;

use crate::{Email, IdentityStore, PresenceState, Session, SessionRegistry};

/// What an AUTH attempt did. Only used for logging and tests; the client
/// never hears about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session is now bound to this account.
    Bound(Email),
    /// No account holds the token; the session is still anonymous.
    UnknownToken,
    /// The store failed; the session is still anonymous.
    StoreUnavailable,
    /// The session closed before the lookup finished.
    SessionClosed,
}

/// Drives the AUTH handshake and presence updates for every session.
///
/// Holds the shared registry and store by `Arc`; one instance serves the
/// whole server.
pub struct HandshakeHandler<S: IdentityStore> {
    registry: Arc<SessionRegistry>,
    store: Arc<S>,
}

impl<S: IdentityStore> HandshakeHandler<S> {
    /// Creates a handler over the given registry and store.
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<S>) -> Self {
        Self { registry, store }
    }

    /// The registry this handler binds sessions in.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The identity store this handler reads and writes.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handles an AUTH frame carrying `token` on session `id`.
    ///
    /// On success the session is bound and the account is saved with
    /// `presence = Online` and a fresh `last_seen`. The registry lock is
    /// not held across the store calls.
    pub async fn authenticate(&self, id: ConnectionId, token: &str) -> AuthOutcome {
        if self.registry.begin_authentication(id).is_err() {
            return AuthOutcome::SessionClosed;
        }

        let mut identity = match self.store.find_user_by_token(token).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.registry.reset_authentication(id);
                tracing::debug!(conn_id = %id, "AUTH with unknown token ignored");
                return AuthOutcome::UnknownToken;
            }
            Err(e) => {
                self.registry.reset_authentication(id);
                tracing::debug!(conn_id = %id, error = %e, "AUTH lookup failed");
                return AuthOutcome::StoreUnavailable;
            }
        };

        // Bind before touching presence: if the socket closed during the
        // lookup, nothing would ever mark the account offline again.
        if self.registry.bind(id, identity.email.clone()).is_err() {
            tracing::debug!(conn_id = %id, "session closed during AUTH lookup");
            return AuthOutcome::SessionClosed;
        }

        let email = identity.email.clone();
        identity.last_seen = unix_millis();
        identity.presence = PresenceState::Online;
        if let Err(e) = self.store.save_user(identity).await {
            tracing::debug!(conn_id = %id, %email, error = %e, "failed to save online presence");
        }

        tracing::info!(conn_id = %id, %email, "session authenticated");
        AuthOutcome::Bound(email)
    }

    /// Close path for session `id`: marks its account offline (if bound),
    /// then removes it from the registry.
    ///
    /// Returns the removed session, or `None` if it was already gone.
    pub async fn disconnect(&self, id: ConnectionId) -> Option<Session> {
        if let Some(email) = self.registry.identity_of(id) {
            self.mark_offline(id, &email).await;
        }

        let removed = self.registry.unregister(id);
        if removed.is_some() {
            tracing::info!(conn_id = %id, "session closed");
        }
        removed
    }

    async fn mark_offline(&self, id: ConnectionId, email: &Email) {
        let mut identity = match self.store.find_user_by_email(email).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::debug!(conn_id = %id, %email, "account vanished before disconnect");
                return;
            }
            Err(e) => {
                tracing::debug!(conn_id = %id, %email, error = %e, "disconnect lookup failed");
                return;
            }
        };

        identity.last_seen = unix_millis();
        identity.presence = PresenceState::Offline;
        if let Err(e) = self.store.save_user(identity).await {
            tracing::debug!(conn_id = %id, %email, error = %e, "failed to save offline presence");
        }
    }
}

/// Milliseconds since the Unix epoch; 0 if the clock is before 1970.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

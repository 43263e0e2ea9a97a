//! Identity types and the store collaborator.
//!
//! Mapcast doesn't own user accounts; the document store does. The session
//! layer only needs three things from it: find an account by session
//! token, find an account by email, and save presence changes back. That
//! contract is the [`IdentityStore`] trait.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::SessionError;

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// An account's email address, which is also its unique key.
///
/// Newtype so an email can't be passed where a token is expected.
/// `#[serde(transparent)]` keeps the JSON form a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Wraps an email address. No validation; the store already did it.
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    /// Borrows the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Email {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// Whether an account currently has a live, authenticated connection.
///
/// Stored as a small integer on the user record (Unknown = 0, Online = 1,
/// Offline = 2), so serde goes through `u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PresenceState {
    /// Never connected since the record was created.
    #[default]
    Unknown,
    /// Bound to at least one live session.
    Online,
    /// Last session closed at `last_seen`.
    Offline,
}

impl From<PresenceState> for u8 {
    fn from(state: PresenceState) -> Self {
        match state {
            PresenceState::Unknown => 0,
            PresenceState::Online => 1,
            PresenceState::Offline => 2,
        }
    }
}

impl TryFrom<u8> for PresenceState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Online),
            2 => Ok(Self::Offline),
            other => Err(format!("invalid presence code {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The real-time view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: Email,
    /// Milliseconds since the Unix epoch of the last connect or disconnect.
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default)]
    pub presence: PresenceState,
}

impl Identity {
    /// A never-seen identity for `email`.
    pub fn new(email: impl Into<Email>) -> Self {
        Self {
            email: email.into(),
            last_seen: 0,
            presence: PresenceState::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// IdentityStore
// ---------------------------------------------------------------------------

/// The persistence collaborator behind the handshake.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one store is shared by every connection
/// task for the life of the server, and the returned futures are `Send` so
/// those tasks can move between worker threads.
///
/// A miss is `Ok(None)`, not an error; `Err` is reserved for the store
/// itself being unavailable.
pub trait IdentityStore: Send + Sync + 'static {
    /// Finds the account whose current session token is `token`.
    fn find_user_by_token(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Option<Identity>, SessionError>> + Send;

    /// Finds the account with this email.
    fn find_user_by_email(
        &self,
        email: &Email,
    ) -> impl std::future::Future<Output = Result<Option<Identity>, SessionError>> + Send;

    /// Persists `identity`'s presence fields.
    fn save_user(
        &self,
        identity: Identity,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryIdentityStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredUser {
    token: String,
    identity: Identity,
}

/// An [`IdentityStore`] kept in process memory.
///
/// Used by the demo server and by tests. Token lookup is a linear scan,
/// which is fine for the handful of accounts those need.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<Email, StoredUser>>,
}

impl MemoryIdentityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account and the token that authenticates it.
    pub async fn insert(&self, identity: Identity, token: impl Into<String>) {
        let user = StoredUser {
            token: token.into(),
            identity,
        };
        self.users
            .write()
            .await
            .insert(user.identity.email.clone(), user);
    }

    /// Returns the stored identity for `email`, if any.
    pub async fn get(&self, email: &Email) -> Option<Identity> {
        self.users
            .read()
            .await
            .get(email)
            .map(|user| user.identity.clone())
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns `true` if no accounts are stored.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn find_user_by_token(&self, token: &str) -> Result<Option<Identity>, SessionError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.token == token)
            .map(|user| user.identity.clone()))
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, SessionError> {
        Ok(self.get(email).await)
    }

    async fn save_user(&self, identity: Identity) -> Result<(), SessionError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&identity.email)
            .ok_or_else(|| SessionError::Store(format!("no account for {}", identity.email)))?;
        user.identity = identity;
        Ok(())
    }
}

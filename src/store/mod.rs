//! Durable bearer-token storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The token store is the only owner of the session token. The auth context
//! reads it once on mount, writes it on login, and clears it on logout.
//!
//! DESIGN
//! ======
//! The token and the cached user are stored under two well-known keys and are
//! always written and cleared as a pair, so a restart never observes one
//! without the other. The cached user is kept as its serialized JSON string,
//! which is where corruption shows up.
//!
//! TRADE-OFFS
//! ==========
//! No expiry check happens here. An expired token is only discovered when
//! the next authenticated request comes back 401.

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::error::AuthError;
use crate::models::User;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "auth_user";

/// A persisted session: the bearer token plus the user cached alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user: Option<User>,
}

/// Synchronous, durable token storage.
pub trait TokenStore: Send + Sync {
    /// Read the bearer token alone. A corrupted cached user does not affect it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn read(&self) -> Result<Option<String>, AuthError>;

    /// Read the token together with its cached user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CorruptedLocalState`] if the cached user cannot be
    /// decoded, or [`AuthError::Storage`] if the backing storage fails.
    fn read_session(&self) -> Result<Option<StoredSession>, AuthError>;

    /// Persist the token and optional user as one unit. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be persisted.
    fn write(&self, token: &str, user: Option<&User>) -> Result<(), AuthError>;

    /// Remove the token and user together. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Load the persisted session, clearing it if it turns out to be corrupted.
///
/// Never fails: any unreadable state is treated as anonymous.
pub fn restore(store: &dyn TokenStore) -> Option<StoredSession> {
    match store.read_session() {
        Ok(session) => session,
        Err(AuthError::CorruptedLocalState(detail)) => {
            tracing::warn!(%detail, "discarding corrupted stored session");
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear corrupted session");
            }
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored session unreadable; starting anonymous");
            None
        }
    }
}

pub(crate) fn encode_user(user: Option<&User>) -> Result<Option<String>, AuthError> {
    user.map(serde_json::to_string)
        .transpose()
        .map_err(|e| AuthError::Storage(e.to_string()))
}

pub(crate) fn decode_user(raw: Option<&str>) -> Result<Option<User>, AuthError> {
    raw.map(serde_json::from_str::<User>)
        .transpose()
        .map_err(|e| AuthError::CorruptedLocalState(e.to_string()))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

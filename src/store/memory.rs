use std::sync::{Arc, Mutex, PoisonError};

use super::{StoredSession, TokenStore, decode_user, encode_user};
use crate::error::AuthError;
use crate::models::User;

#[derive(Debug, Clone)]
struct Entry {
    token: String,
    user_json: Option<String>,
}

/// Process-local token store for tests and the in-memory backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    entry: Arc<Mutex<Option<Entry>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw cached-user string, bypassing serialization.
    #[must_use]
    pub fn with_raw(token: impl Into<String>, user_json: Option<&str>) -> Self {
        let store = Self::new();
        *store.lock() = Some(Entry { token: token.into(), user_json: user_json.map(str::to_owned) });
        store
    }

    /// Whether anything at all is persisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Entry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<Option<String>, AuthError> {
        Ok(self.lock().as_ref().map(|e| e.token.clone()))
    }

    fn read_session(&self) -> Result<Option<StoredSession>, AuthError> {
        let guard = self.lock();
        let Some(entry) = guard.as_ref() else {
            return Ok(None);
        };
        let user = decode_user(entry.user_json.as_deref())?;
        Ok(Some(StoredSession { token: entry.token.clone(), user }))
    }

    fn write(&self, token: &str, user: Option<&User>) -> Result<(), AuthError> {
        let user_json = encode_user(user)?;
        *self.lock() = Some(Entry { token: token.to_owned(), user_json });
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.lock().take();
        Ok(())
    }
}

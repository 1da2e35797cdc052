//! Filesystem-backed token store.
//!
//! The session lives in one JSON file:
//!
//! ```text
//! { "auth_token": "<bearer>", "auth_user": "<serialized user json>" }
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place, so the
//! token/user pair is replaced atomically. Clearing removes the file.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{StoredSession, TOKEN_KEY, TokenStore, USER_KEY, decode_user, encode_user};
use crate::error::AuthError;
use crate::models::User;

/// Durable token store that survives process restarts.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_entries(&self) -> Result<Option<BTreeMap<String, String>>, AuthError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Storage(format!("{}: {e}", self.path.display()))),
        };
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| AuthError::CorruptedLocalState(e.to_string()))?;
        Ok(Some(entries))
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<Option<String>, AuthError> {
        match self.read_entries() {
            Ok(entries) => Ok(entries.and_then(|mut map| map.remove(TOKEN_KEY))),
            // An unreadable file holds no usable token.
            Err(AuthError::CorruptedLocalState(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_session(&self) -> Result<Option<StoredSession>, AuthError> {
        let Some(mut entries) = self.read_entries()? else {
            return Ok(None);
        };
        let Some(token) = entries.remove(TOKEN_KEY) else {
            if entries.contains_key(USER_KEY) {
                return Err(AuthError::CorruptedLocalState("cached user without token".into()));
            }
            return Ok(None);
        };
        let user = decode_user(entries.get(USER_KEY).map(String::as_str))?;
        Ok(Some(StoredSession { token, user }))
    }

    fn write(&self, token: &str, user: Option<&User>) -> Result<(), AuthError> {
        let mut entries = BTreeMap::new();
        entries.insert(TOKEN_KEY.to_owned(), token.to_owned());
        if let Some(user_json) = encode_user(user)? {
            entries.insert(USER_KEY.to_owned(), user_json);
        }
        let body = serde_json::to_vec_pretty(&entries).map_err(|e| AuthError::Storage(e.to_string()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| AuthError::Storage(format!("{}: {e}", dir.display())))?;
        }
        let tmp = self.temp_path();
        std::fs::write(&tmp, body).map_err(|e| AuthError::Storage(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| AuthError::Storage(format!("{}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }
}

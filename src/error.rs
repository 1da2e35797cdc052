//! Auth error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Every failure the session layer can see is a variant here. Callers render
//! `user_message()` inline; nothing in the login or guard path panics.

/// Errors produced by the token store, backend client, and auth context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Credentials failed local validation and were never sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The user authenticated but may not use the requested portal.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The backend rejected the bearer token (401 on a session fetch).
    #[error("session rejected: status {status}")]
    Unauthorized { status: u16 },

    /// The request could not be completed (connect, transport, 5xx, bad body).
    #[error("network request failed: {0}")]
    TransientNetwork(String),

    /// The request did not complete within the configured bound.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The persisted session could not be decoded.
    #[error("stored session is corrupted: {0}")]
    CorruptedLocalState(String),

    /// The durable token store could not be read or written.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    /// Text suitable for inline display next to a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Authentication(msg) | Self::Authorization(msg) => msg.clone(),
            Self::Unauthorized { .. } => "Your session has expired. Please sign in again.".to_owned(),
            Self::TransientNetwork(_) => "Unable to reach the server. Please try again.".to_owned(),
            Self::Timeout { .. } => "The server took too long to respond. Please try again.".to_owned(),
            Self::CorruptedLocalState(_) | Self::Storage(_) | Self::HttpClientBuild(_) => {
                "Something went wrong. Please sign in again.".to_owned()
            }
        }
    }

    /// Whether the failure is worth retrying without user intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

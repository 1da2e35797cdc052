//! Auth backend interface and its HTTP implementation.
//!
//! ERROR HANDLING
//! ==============
//! Status codes are folded into the auth taxonomy here so the context never
//! looks at HTTP details: rejected logins become `Authentication`, rejected
//! tokens become `Unauthorized`, everything else is transient.

use reqwest::{Method, StatusCode};

use super::client::ApiClient;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{CurrentUser, Credentials, ErrorBody, LoginResponse};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// Backend operations the session layer depends on. Enables fakes in tests.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a token and user.
    ///
    /// # Errors
    ///
    /// [`AuthError::Authentication`] when the credentials are rejected, or a
    /// transient error when the backend cannot be reached.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;

    /// Invalidate `token` server-side. Callers treat failures as non-fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;

    /// Fetch the profile that `token` belongs to.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] when the token is invalid or expired, or a
    /// transient error otherwise.
    async fn current_user(&self, token: &str) -> Result<CurrentUser, AuthError>;
}

// =============================================================================
// HTTP BACKEND
// =============================================================================

/// Talks to the real `/api/auth/*` and current-user endpoints.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ApiClient,
    current_user_path: String,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(client: ApiClient, config: &AuthConfig) -> Self {
        Self {
            client,
            current_user_path: config.current_user_path.clone(),
            timeout_secs: config.request_timeout.as_secs(),
        }
    }

    fn transport_error(&self, e: &reqwest::Error) -> AuthError {
        if e.is_timeout() {
            AuthError::Timeout { secs: self.timeout_secs }
        } else {
            AuthError::TransientNetwork(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl AuthBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        let resp = self
            .client
            .post(LOGIN_PATH)
            .json(credentials)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(&e))?;
        if !status.is_success() {
            return Err(login_failure(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| AuthError::TransientNetwork(format!("invalid login response: {e}")))
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let resp = self
            .client
            .request_as(Method::POST, LOGOUT_PATH, token)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::TransientNetwork(format!("logout failed: {status}")));
        }
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let resp = self
            .client
            .request_as(Method::GET, &self.current_user_path, token)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = resp.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::Unauthorized { status: status.as_u16() });
        }
        if !status.is_success() {
            return Err(AuthError::TransientNetwork(format!("current user fetch failed: {status}")));
        }
        let body = resp.text().await.map_err(|e| self.transport_error(&e))?;
        parse_current_user(&body)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Map a non-2xx login response to the message the form should show.
pub(crate) fn login_failure(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    match message {
        Some(message) => AuthError::Authentication(message),
        None if status.is_server_error() => AuthError::TransientNetwork(format!("login failed: {status}")),
        None => AuthError::Authentication(format!("Login failed ({})", status.as_u16())),
    }
}

pub(crate) fn parse_current_user(body: &str) -> Result<CurrentUser, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::TransientNetwork(format!("invalid current user response: {e}")))
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

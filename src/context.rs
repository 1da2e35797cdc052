//! Auth context: the session state machine shared by guards and views.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `AuthContext` is mounted per process. It owns the token store, the
//! session query, and the injected API client, and publishes an
//! `AuthSnapshot` over a watch channel so guards re-evaluate on change.
//!
//! DESIGN
//! ======
//! Phases: `Anonymous → Authenticating → Authenticated → Anonymous`.
//! Login and logout are serialized on a transition lock, so a logout cannot
//! interleave with a half-finished login. Session results are applied in
//! issuance order; a lookup overtaken by an invalidation or a logout is
//! ignored. A login through the wrong portal is refused before the session
//! is stored or published.
//!
//! TRADE-OFFS
//! ==========
//! A 401 on refresh drops the user but leaves the stored token in place;
//! only `logout` clears it. Transient refresh failures keep the current user.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{Credentials, LoginResponse, Role, User};
use crate::net::{ApiClient, AuthBackend, HttpBackend, InterceptorBinding};
use crate::routes;
use crate::session::{SessionQuery, SessionResult};
use crate::store::{self, TokenStore};

/// Shown when a user signs in through a portal their role does not grant.
pub const ACCESS_DENIED: &str = "Access denied for this portal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Everything a view needs to know about the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    pub user: Option<User>,
    /// Role-specific profile data from the last session fetch.
    pub role_data: serde_json::Value,
    /// The session has not been resolved yet; guards must not decide.
    pub is_loading: bool,
    /// Most recent login failure. Cleared when a new login starts.
    pub error: Option<AuthError>,
    /// Last non-transient session fetch failure.
    pub session_error: Option<AuthError>,
}

impl AuthSnapshot {
    pub(crate) fn anonymous() -> Self {
        Self {
            phase: AuthPhase::Anonymous,
            user: None,
            role_data: serde_json::Value::Null,
            is_loading: false,
            error: None,
            session_error: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.user.is_some()
    }
}

/// Result of a successful `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user: User,
    /// Where navigation should go next.
    pub redirect_to: String,
}

pub struct AuthContext {
    config: AuthConfig,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    client: ApiClient,
    query: SessionQuery,
    state: watch::Sender<AuthSnapshot>,
    applied_seq: AtomicU64,
    transition: tokio::sync::Mutex<()>,
    _binding: InterceptorBinding,
}

impl AuthContext {
    /// Mount the context: restore the persisted session and start injecting
    /// the bearer header through `client`.
    ///
    /// A restored token leaves the snapshot loading until [`Self::refresh`]
    /// resolves it. A corrupted stored session is cleared and ignored.
    pub fn mount(
        config: AuthConfig,
        client: ApiClient,
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let restored = store::restore(store.as_ref());
        let binding = client.bind();

        let mut snapshot = AuthSnapshot::anonymous();
        if let Some(session) = &restored {
            client.set_token(Some(session.token.clone()));
            snapshot.is_loading = true;
            if let Some(user) = &session.user {
                snapshot.phase = AuthPhase::Authenticated;
                snapshot.user = Some(user.clone());
            }
            tracing::info!(cached_user = session.user.is_some(), "restored stored session");
        }

        let query = SessionQuery::new(Arc::clone(&backend), config.session_stale_after, config.request_timeout);
        let (state, _) = watch::channel(snapshot);
        Self {
            config,
            backend,
            store,
            client,
            query,
            state,
            applied_seq: AtomicU64::new(0),
            transition: tokio::sync::Mutex::new(()),
            _binding: binding,
        }
    }

    /// Mount against the real HTTP backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn http(config: AuthConfig, store: Arc<dyn TokenStore>) -> Result<Self, AuthError> {
        let client = ApiClient::new(&config)?;
        let backend = Arc::new(HttpBackend::new(client.clone(), &config));
        Ok(Self::mount(config, client, backend, store))
    }

    /// The shared API client. Clones carry the session's bearer token.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        self.client.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Re-run the session query for the stored token and publish the result.
    pub async fn refresh(&self) -> AuthSnapshot {
        let token = self.stored_token();
        let result = self.query.fetch(token.as_deref()).await;
        self.apply_session(token.is_some(), result);
        self.snapshot()
    }

    fn apply_session(&self, has_token: bool, result: SessionResult) {
        if result.superseded {
            return;
        }
        let seq = result.seq;
        let applied = self.state.send_if_modified(|s| {
            // Checked under the channel lock so a concurrent logout wins.
            if self.applied_seq.fetch_max(seq, Ordering::AcqRel) > seq {
                return false;
            }
            s.is_loading = false;
            match (result.current, result.error) {
                (Some(current), error) => {
                    s.phase = AuthPhase::Authenticated;
                    s.user = Some(current.user);
                    s.role_data = current.role_data;
                    s.session_error = error.filter(|e| !e.is_transient());
                }
                (None, Some(error)) if error.is_transient() => {
                    // Keep whatever user we already had.
                }
                (None, error) => {
                    s.phase = AuthPhase::Anonymous;
                    s.user = None;
                    s.role_data = serde_json::Value::Null;
                    s.session_error = if has_token { error } else { None };
                }
            }
            true
        });
        if !applied {
            tracing::debug!(seq, "ignoring out-of-order session result");
        }
    }

    fn stored_token(&self) -> Option<String> {
        self.store.read().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "token store unreadable");
            None
        })
    }

    // =========================================================================
    // LOGIN / LOGOUT
    // =========================================================================

    /// Authenticate with `credentials`, accepting any role.
    ///
    /// # Errors
    ///
    /// See [`Self::login_for_portal`].
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, AuthError> {
        self.sign_in(credentials, None).await
    }

    /// Authenticate through `portal`'s login form.
    ///
    /// On success the token and user are persisted together, the session cache
    /// is invalidated and refetched, and the snapshot becomes `Authenticated`.
    /// A user whose role does not grant `portal` is refused before anything is
    /// stored or published: the new token is revoked on the backend and only
    /// the error is shown. On any failure the previous phase is restored and
    /// the stored session is left as it was.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] for empty fields (nothing is sent), the
    /// backend's error for rejected credentials, [`AuthError::Authorization`]
    /// for the wrong portal, [`AuthError::Timeout`], or [`AuthError::Storage`]
    /// if the session cannot be persisted.
    pub async fn login_for_portal(&self, credentials: Credentials, portal: Role) -> Result<LoginOutcome, AuthError> {
        self.sign_in(credentials, Some(portal)).await
    }

    async fn sign_in(&self, credentials: Credentials, portal: Option<Role>) -> Result<LoginOutcome, AuthError> {
        let _transition = self.transition.lock().await;

        if let Err(e) = validate_credentials(&credentials) {
            self.state.send_modify(|s| s.error = Some(e.clone()));
            return Err(e);
        }

        let previous_phase = self.state.borrow().phase;
        self.state.send_modify(|s| {
            s.error = None;
            s.phase = AuthPhase::Authenticating;
        });

        let response = match self.establish(&credentials, portal).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "login failed");
                self.state.send_modify(|s| {
                    s.phase = previous_phase;
                    s.error = Some(e.clone());
                });
                return Err(e);
            }
        };

        self.client.set_token(Some(response.token.clone()));
        self.query.invalidate();
        let result = self.query.fetch(Some(&response.token)).await;
        if result.current.is_none() || result.superseded {
            tracing::warn!("session refetch after login returned no profile; using login response");
        }
        let seq = result.seq;
        let (user, role_data) = match result.current.filter(|_| !result.superseded) {
            Some(current) => (current.user, current.role_data),
            None => (response.user.clone(), serde_json::Value::Null),
        };

        self.state.send_modify(|s| {
            self.applied_seq.fetch_max(seq, Ordering::AcqRel);
            s.phase = AuthPhase::Authenticated;
            s.user = Some(user.clone());
            s.role_data = role_data;
            s.is_loading = false;
            s.error = None;
            s.session_error = None;
        });
        tracing::info!(username = %user.username, role = %user.role, "login succeeded");

        let redirect_to = routes::post_login_target(response.redirect_to.as_deref(), user.role);
        Ok(LoginOutcome { user, redirect_to })
    }

    /// Exchange credentials for a token and persist it. A token that is
    /// refused here is revoked before returning, so it never outlives the
    /// failed login.
    async fn establish(&self, credentials: &Credentials, portal: Option<Role>) -> Result<LoginResponse, AuthError> {
        let response = match tokio::time::timeout(self.config.request_timeout, self.backend.login(credentials)).await {
            Ok(result) => result?,
            Err(_) => return Err(AuthError::Timeout { secs: self.config.request_timeout.as_secs() }),
        };

        if let Some(portal) = portal.filter(|p| !response.user.role.grants(*p)) {
            tracing::warn!(%portal, role = %response.user.role, "login refused for portal");
            self.revoke_remote(&response.token).await;
            return Err(AuthError::Authorization(ACCESS_DENIED.to_owned()));
        }

        if let Err(e) = self.store.write(&response.token, Some(&response.user)) {
            tracing::error!(error = %e, "failed to persist session; revoking token");
            self.revoke_remote(&response.token).await;
            return Err(e);
        }
        Ok(response)
    }

    /// End the session. Always leaves the store empty and the snapshot
    /// anonymous; a backend failure is logged and otherwise ignored.
    /// Calling it again with nothing to clear does nothing.
    pub async fn logout(&self) {
        let _transition = self.transition.lock().await;

        let token = self.stored_token().or_else(|| self.client.token());
        let anonymous = {
            let s = self.state.borrow();
            s.phase == AuthPhase::Anonymous && s.user.is_none()
        };
        if token.is_none() && anonymous {
            tracing::debug!("logout with no session; nothing to do");
            return;
        }

        if let Some(token) = &token {
            self.revoke_remote(token).await;
        }

        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear token store");
        }
        self.client.set_token(None);
        let barrier = self.query.clear();
        self.state.send_modify(|s| {
            // Session results issued before the clear must not resurrect the user.
            self.applied_seq.fetch_max(barrier, Ordering::AcqRel);
            *s = AuthSnapshot::anonymous();
        });
        tracing::info!("logged out");
    }

    /// Best-effort server-side logout, bounded by the request timeout.
    async fn revoke_remote(&self, token: &str) {
        match tokio::time::timeout(self.config.request_timeout, self.backend.logout(token)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "backend logout failed; clearing locally"),
            Err(_) => tracing::warn!("backend logout timed out; clearing locally"),
        }
    }
}

/// Reject empty credentials before they reach the backend.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] naming the missing field(s).
pub fn validate_credentials(credentials: &Credentials) -> Result<(), AuthError> {
    let username_missing = credentials.username.trim().is_empty();
    let password_missing = credentials.password.trim().is_empty();
    match (username_missing, password_missing) {
        (false, false) => Ok(()),
        (true, false) => Err(AuthError::Validation("Username is required".into())),
        (false, true) => Err(AuthError::Validation("Password is required".into())),
        (true, true) => Err(AuthError::Validation("Username and password are required".into())),
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

//! Login form for one portal.
//!
//! The form validates input locally and submits through the auth context for
//! the portal it was opened for. A role that does not belong to the portal is
//! refused by the context before any session is stored or published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub use crate::context::ACCESS_DENIED;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::models::{Credentials, Role};

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Check the raw inputs and build credentials from them.
///
/// The username is trimmed. The password is sent as typed but must not be
/// blank.
///
/// # Errors
///
/// Returns the field errors when either input is blank.
pub fn validate_login_input(username: &str, password: &str) -> Result<Credentials, FieldErrors> {
    let username = username.trim();
    let errors = FieldErrors {
        username: username.is_empty().then(|| "Username is required".to_owned()),
        password: password.trim().is_empty().then(|| "Password is required".to_owned()),
    };
    if errors.is_empty() { Ok(Credentials::new(username, password)) } else { Err(errors) }
}

/// What the modal is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginFormState {
    pub open: bool,
    pub errors: FieldErrors,
    /// Form-level message, e.g. rejected credentials.
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Field validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// A submission is already in flight.
    Busy,
    /// The backend refused or could not be reached.
    Failed(String),
    /// Credentials were valid but the role does not belong to this portal.
    Denied(String),
    Success { redirect_to: String },
}

pub struct LoginForm {
    portal: Role,
    settle_delay: Duration,
    submitting: AtomicBool,
    state: Mutex<LoginFormState>,
}

impl LoginForm {
    #[must_use]
    pub fn new(portal: Role, settle_delay: Duration) -> Self {
        Self {
            portal,
            settle_delay,
            submitting: AtomicBool::new(false),
            state: Mutex::new(LoginFormState::default()),
        }
    }

    /// Form using the context's configured settle delay.
    #[must_use]
    pub fn for_context(portal: Role, ctx: &AuthContext) -> Self {
        Self::new(portal, ctx.config().login_settle_delay)
    }

    #[must_use]
    pub fn portal(&self) -> Role {
        self.portal
    }

    /// Open the modal with a clean slate.
    pub fn open(&self) {
        *self.lock() = LoginFormState { open: true, ..LoginFormState::default() };
    }

    pub fn close(&self) {
        self.lock().open = false;
    }

    #[must_use]
    pub fn state(&self) -> LoginFormState {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Submit the form.
    ///
    /// On success waits the settle delay, calls `on_success` with the
    /// redirect target and closes the modal. Every other outcome leaves the
    /// modal open with the reason shown.
    pub async fn submit(
        &self,
        ctx: &AuthContext,
        username: &str,
        password: &str,
        on_success: impl FnOnce(&str),
    ) -> SubmitOutcome {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SubmitOutcome::Busy;
        }
        let _submitting = SubmittingFlag(&self.submitting);

        let credentials = match validate_login_input(username, password) {
            Ok(credentials) => credentials,
            Err(errors) => {
                let mut state = self.lock();
                state.errors = errors.clone();
                state.message = None;
                return SubmitOutcome::Invalid(errors);
            }
        };
        {
            let mut state = self.lock();
            state.errors = FieldErrors::default();
            state.message = None;
        }

        let outcome = match ctx.login_for_portal(credentials, self.portal).await {
            Ok(outcome) => outcome,
            Err(AuthError::Authorization(message)) => {
                self.lock().message = Some(message.clone());
                return SubmitOutcome::Denied(message);
            }
            Err(e) => {
                let message = e.user_message();
                self.lock().message = Some(message.clone());
                return SubmitOutcome::Failed(message);
            }
        };

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        on_success(&outcome.redirect_to);
        self.close();
        SubmitOutcome::Success { redirect_to: outcome.redirect_to }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoginFormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the submitting flag however `submit` exits.
struct SubmittingFlag<'a>(&'a AtomicBool);

impl Drop for SubmittingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;

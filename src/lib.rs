//! Client-side session and portal authorization for the lead marketplace.

pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod login;
pub mod models;
pub mod net;
pub mod routes;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{AuthConfig, ConfigError};
pub use context::{AuthContext, AuthPhase, AuthSnapshot, LoginOutcome};
pub use error::AuthError;
pub use guard::{Guard, GuardDecision, Guarded, RequiredRoleGuard, RoleListGuard};
pub use login::{LoginForm, SubmitOutcome};
pub use models::{Credentials, CurrentUser, LoginResponse, Role, User};

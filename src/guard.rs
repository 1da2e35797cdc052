//! Route authorization guards.
//!
//! A guard looks at an `AuthSnapshot` and returns what the router should do:
//! wait, render the protected view, or redirect. Decisions are plain values;
//! nothing here navigates or panics. Admins pass every role check.

use crate::context::AuthSnapshot;
use crate::models::Role;
use crate::routes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a spinner, decide later.
    Loading,
    Render,
    Redirect(String),
}

/// The outcome of [`Guard::render`]. Content only exists when authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Loading,
    Redirect(String),
    Content(T),
}

pub trait Guard {
    fn decide(&self, snapshot: &AuthSnapshot) -> GuardDecision;

    /// Build the protected view only if the guard allows it.
    fn render<T>(&self, snapshot: &AuthSnapshot, children: impl FnOnce() -> T) -> Guarded<T>
    where
        Self: Sized,
    {
        match self.decide(snapshot) {
            GuardDecision::Loading => Guarded::Loading,
            GuardDecision::Redirect(path) => Guarded::Redirect(path),
            GuardDecision::Render => Guarded::Content(children()),
        }
    }
}

/// Guard over an optional allow-list of roles.
///
/// Anonymous visitors go to the login page. A signed-in user whose role is
/// not allowed is sent to their own dashboard.
#[derive(Debug, Clone, Default)]
pub struct RoleListGuard {
    allowed: Option<Vec<Role>>,
}

impl RoleListGuard {
    /// Any signed-in user may pass.
    #[must_use]
    pub fn any() -> Self {
        Self { allowed: None }
    }

    #[must_use]
    pub fn allow(roles: impl IntoIterator<Item = Role>) -> Self {
        Self { allowed: Some(roles.into_iter().collect()) }
    }
}

impl Guard for RoleListGuard {
    fn decide(&self, snapshot: &AuthSnapshot) -> GuardDecision {
        if snapshot.is_loading {
            return GuardDecision::Loading;
        }
        let Some(user) = snapshot.user.as_ref() else {
            return GuardDecision::Redirect(routes::LOGIN.to_owned());
        };
        match &self.allowed {
            Some(allowed) if !allowed.iter().any(|r| user.role.grants(*r)) => {
                GuardDecision::Redirect(routes::canonical_destination(Some(user.role)).to_owned())
            }
            _ => GuardDecision::Render,
        }
    }
}

/// Guard requiring one specific role. Every failure leads back to portal
/// selection.
#[derive(Debug, Clone, Default)]
pub struct RequiredRoleGuard {
    required: Option<Role>,
}

impl RequiredRoleGuard {
    #[must_use]
    pub fn new(required: Option<Role>) -> Self {
        Self { required }
    }
}

impl Guard for RequiredRoleGuard {
    fn decide(&self, snapshot: &AuthSnapshot) -> GuardDecision {
        if snapshot.is_loading {
            return GuardDecision::Loading;
        }
        let portal = || GuardDecision::Redirect(routes::PORTAL_SELECT.to_owned());
        if snapshot.session_error.is_some() {
            return portal();
        }
        let Some(user) = snapshot.user.as_ref() else {
            return portal();
        };
        match self.required {
            Some(required) if !user.role.grants(required) => portal(),
            _ => GuardDecision::Render,
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

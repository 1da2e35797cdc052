//! In-memory auth backend.
//!
//! Stands in for the `/api/auth/*` endpoints in tests and offline demos. It
//! keeps the same contract as the HTTP backend, including the error mapping,
//! and counts calls so tests can assert on network traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::backend::AuthBackend;
use crate::error::AuthError;
use crate::models::{CurrentUser, Credentials, LoginResponse, Role, User};
use crate::routes;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: User,
    role_data: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: Mutex<HashMap<String, String>>,
    next_token: AtomicUsize,
    offline: AtomicBool,
    latency: Mutex<Duration>,
    logout_fails: AtomicBool,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    current_user_calls: AtomicUsize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with one account per portal.
    #[must_use]
    pub fn with_demo_accounts() -> Self {
        let backend = Self::new();
        backend.add_account(demo_user(1, "alexneilson02", "Alex Neilson", Role::Salesperson), "password123");
        backend.add_account(demo_user(2, "bobbuilds", "Bob Builder", Role::Contractor), "password123");
        backend.add_account(demo_user(3, "admin", "Site Admin", Role::Admin), "password123");
        backend
    }

    pub fn add_account(&self, user: User, password: &str) {
        let role_data = match user.role {
            Role::Salesperson => serde_json::json!({ "referralCode": format!("REF-{}", user.id) }),
            Role::Contractor => serde_json::json!({ "companyName": format!("{} LLC", user.full_name) }),
            Role::Admin => serde_json::json!({}),
        };
        let account = Account { password: password.to_owned(), user, role_data };
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account.user.username.clone(), account);
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Make only logout fail, leaving login and session fetches working.
    pub fn set_logout_fails(&self, fails: bool) {
        self.logout_fails.store(fails, Ordering::SeqCst);
    }

    /// Server-side revocation, as if the session expired.
    pub fn revoke(&self, token: &str) {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).remove(token);
    }

    #[must_use]
    pub fn is_live(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
    }

    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<(), AuthError> {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::TransientNetwork("backend unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthBackend for MemoryBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let account = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&credentials.username)
            .filter(|a| a.password == credentials.password)
            .cloned()
            .ok_or_else(|| AuthError::Authentication("Invalid credentials".into()))?;

        let n = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("mem-{n}-{}", account.user.id);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), account.user.username.clone());

        let redirect_to = routes::canonical_destination(Some(account.user.role)).to_owned();
        Ok(LoginResponse { token, user: account.user, redirect_to: Some(redirect_to) })
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(AuthError::TransientNetwork("logout endpoint unavailable".into()));
        }
        self.revoke(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<CurrentUser, AuthError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let username = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::Unauthorized { status: 401 })?;
        let account = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&username)
            .cloned()
            .ok_or(AuthError::Unauthorized { status: 401 })?;
        Ok(CurrentUser { user: account.user, role_data: account.role_data })
    }
}

fn demo_user(id: u32, username: &str, full_name: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        username: username.to_owned(),
        full_name: full_name.to_owned(),
        email: format!("{username}@example.com"),
        role,
        avatar_url: None,
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

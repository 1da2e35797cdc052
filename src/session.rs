//! Session query: the cached fetch of the current user's profile.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth context asks this module "who does this token belong to?" on
//! mount, after login, and on explicit refresh. Login and logout invalidate
//! the cache from outside.
//!
//! DESIGN
//! ======
//! The cache holds at most one entry, keyed by token. Every backend fetch is
//! stamped with a sequence number when it is issued. A result is applied only
//! if it was issued after the last invalidation and after the entry it would
//! replace, so a slow request can never overwrite a newer one. Concurrent
//! callers serialize on a fetch gate and re-check the cache, which collapses
//! identical requests into one backend call.
//!
//! TRADE-OFFS
//! ==========
//! A failed fetch never clears the stored token. A 401 resolves to "no user"
//! and a transient failure keeps serving the previous profile for the same
//! token. The UI stays stable through network blips; a dead token is only
//! dropped by an explicit logout.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::AuthError;
use crate::models::CurrentUser;
use crate::net::AuthBackend;

#[derive(Debug, Clone)]
struct CacheEntry {
    token: String,
    seq: u64,
    fetched_at: Instant,
    stale: bool,
    data: CurrentUser,
}

#[derive(Debug, Default)]
struct QueryState {
    entry: Option<CacheEntry>,
    next_seq: u64,
    /// Results issued before this sequence number are discarded.
    valid_from: u64,
}

/// Outcome of one session lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    /// Issuance order of the data returned (the cache entry's on a hit).
    pub seq: u64,
    pub current: Option<CurrentUser>,
    /// Why the backend call failed, if it did.
    pub error: Option<AuthError>,
    /// The fetch was overtaken by an invalidation; a newer lookup owns the result.
    pub superseded: bool,
}

impl SessionResult {
    fn disabled() -> Self {
        Self { seq: 0, current: None, error: None, superseded: false }
    }
}

pub struct SessionQuery {
    backend: Arc<dyn AuthBackend>,
    stale_after: Duration,
    request_timeout: Duration,
    state: Mutex<QueryState>,
    fetch_gate: tokio::sync::Mutex<()>,
}

impl SessionQuery {
    pub fn new(backend: Arc<dyn AuthBackend>, stale_after: Duration, request_timeout: Duration) -> Self {
        Self {
            backend,
            stale_after,
            request_timeout,
            state: Mutex::new(QueryState { next_seq: 1, ..QueryState::default() }),
            fetch_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolve the profile for `token`. A `None` token is a disabled query and
    /// never touches the network.
    pub async fn fetch(&self, token: Option<&str>) -> SessionResult {
        let Some(token) = token else {
            return SessionResult::disabled();
        };

        if let Some(hit) = self.fresh_at(token, Instant::now()) {
            return hit;
        }
        let _gate = self.fetch_gate.lock().await;
        if let Some(hit) = self.fresh_at(token, Instant::now()) {
            return hit;
        }

        let seq = self.issue();
        let result = match tokio::time::timeout(self.request_timeout, self.backend.current_user(token)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout { secs: self.request_timeout.as_secs() }),
        };
        self.settle_at(token, seq, result, Instant::now())
    }

    /// Mark the cached entry stale and discard every fetch already in flight.
    /// The stale profile is still served if the next fetch fails transiently.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.valid_from = state.next_seq;
        if let Some(entry) = state.entry.as_mut() {
            entry.stale = true;
        }
        tracing::debug!(valid_from = state.valid_from, "session cache invalidated");
    }

    /// Drop the cache entirely, as on logout. Returns the new barrier: every
    /// result with a lower sequence number predates the clear.
    pub fn clear(&self) -> u64 {
        let mut state = self.lock();
        state.valid_from = state.next_seq;
        state.entry = None;
        state.valid_from
    }

    /// The cached profile for `token`, fresh or not.
    #[must_use]
    pub fn cached(&self, token: &str) -> Option<CurrentUser> {
        self.lock()
            .entry
            .as_ref()
            .filter(|e| e.token == token)
            .map(|e| e.data.clone())
    }

    fn fresh_at(&self, token: &str, now: Instant) -> Option<SessionResult> {
        let state = self.lock();
        let entry = state.entry.as_ref()?;
        if entry.token != token || entry.stale || now.duration_since(entry.fetched_at) >= self.stale_after {
            return None;
        }
        Some(SessionResult { seq: entry.seq, current: Some(entry.data.clone()), error: None, superseded: false })
    }

    fn issue(&self) -> u64 {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        seq
    }

    fn settle_at(&self, token: &str, seq: u64, result: Result<CurrentUser, AuthError>, now: Instant) -> SessionResult {
        let mut state = self.lock();
        let newer_cached = state
            .entry
            .as_ref()
            .is_some_and(|e| e.token == token && e.seq > seq);
        let superseded = seq < state.valid_from || newer_cached;

        match result {
            Ok(data) => {
                if superseded {
                    tracing::debug!(seq, "discarding superseded session fetch");
                    return SessionResult { seq, current: Some(data), error: None, superseded: true };
                }
                state.entry = Some(CacheEntry {
                    token: token.to_owned(),
                    seq,
                    fetched_at: now,
                    stale: false,
                    data: data.clone(),
                });
                SessionResult { seq, current: Some(data), error: None, superseded: false }
            }
            Err(AuthError::Unauthorized { status }) => {
                tracing::info!(status, "session token rejected");
                if !superseded && state.entry.as_ref().is_some_and(|e| e.token == token) {
                    state.entry = None;
                }
                SessionResult { seq, current: None, error: Some(AuthError::Unauthorized { status }), superseded }
            }
            Err(e) => {
                tracing::warn!(error = %e, "session fetch failed; keeping previous profile");
                let previous = state
                    .entry
                    .as_ref()
                    .filter(|entry| entry.token == token)
                    .map(|entry| (entry.seq, entry.data.clone()));
                match previous {
                    Some((prev_seq, data)) => {
                        SessionResult { seq: prev_seq, current: Some(data), error: Some(e), superseded }
                    }
                    None => SessionResult { seq, current: None, error: Some(e), superseded },
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

//! Injected HTTP client that carries the bearer token.
//!
//! ARCHITECTURE
//! ============
//! The auth context builds one `ApiClient` and hands clones of it to every
//! consumer. Clones share the held token and the binding count, so setting the
//! token once affects every request issued afterwards.
//!
//! Header injection is scoped by `InterceptorBinding` guards. While at least
//! one binding is alive, requests whose URL contains the API prefix get
//! `Authorization: Bearer <token>`. Dropping the last binding turns injection
//! off again; bindings are counted, so a second mount never clobbers the first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Default)]
struct Shared {
    token: RwLock<Option<String>>,
    bindings: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
    shared: Arc<Shared>,
}

impl ApiClient {
    /// Build a client with the configured connect and request timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            api_prefix: config.api_prefix.clone(),
            shared: Arc::default(),
        })
    }

    /// Replace the held token. `None` stops header injection for new requests.
    pub fn set_token(&self, token: Option<String>) {
        *self.shared.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.shared
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start injecting the bearer header until the returned guard is dropped.
    #[must_use = "injection stops as soon as the binding is dropped"]
    pub fn bind(&self) -> InterceptorBinding {
        let previous = self.shared.bindings.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(bindings = previous + 1, "auth header injection bound");
        InterceptorBinding { shared: Arc::clone(&self.shared) }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.shared.bindings.load(Ordering::Acquire) > 0
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    /// Header value the held token would contribute to a request for `url`.
    #[must_use]
    pub fn authorization_for(&self, url: &str) -> Option<String> {
        let token = self.token()?;
        self.authorization_with(url, &token)
    }

    fn authorization_with(&self, url: &str, token: &str) -> Option<String> {
        if !self.is_bound() || token.is_empty() || !url.contains(&self.api_prefix) {
            return None;
        }
        Some(format!("Bearer {token}"))
    }

    /// Build a request, attaching the held token when it applies.
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        let auth = self.authorization_for(&url);
        Self::with_auth(self.http.request(method, url), auth)
    }

    /// Build a request authorized with an explicit token instead of the held one.
    pub fn request_as(&self, method: Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        let auth = self.authorization_with(&url, token);
        Self::with_auth(self.http.request(method, url), auth)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::POST, path)
    }

    fn with_auth(builder: reqwest::RequestBuilder, auth: Option<String>) -> reqwest::RequestBuilder {
        match auth {
            Some(value) => builder.header(reqwest::header::AUTHORIZATION, value),
            None => builder,
        }
    }
}

/// Keeps bearer-header injection active for its lifetime.
#[derive(Debug)]
pub struct InterceptorBinding {
    shared: Arc<Shared>,
}

impl Drop for InterceptorBinding {
    fn drop(&mut self) {
        let previous = self.shared.bindings.fetch_sub(1, Ordering::AcqRel);
        tracing::debug!(bindings = previous.saturating_sub(1), "auth header injection released");
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

//! Session configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_CURRENT_USER_PATH: &str = "/api/users/me";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SESSION_STALE_SECS: u64 = 300;
pub const DEFAULT_LOGIN_SETTLE_MS: u64 = 100;
pub const DEFAULT_TOKEN_FILE: &str = ".portal-auth/session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config value {var} is empty")]
    Empty { var: &'static str },
    #[error("config value {var} must start with '/': {value}")]
    NotAPath { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Origin the relative endpoint paths resolve against.
    pub api_base_url: String,
    /// Requests whose URL contains this prefix receive the bearer header.
    pub api_prefix: String,
    pub current_user_path: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// How long a cached session result is served without refetching.
    pub session_stale_after: Duration,
    /// Pause after a successful login before handing off navigation.
    pub login_settle_delay: Duration,
    pub token_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            api_prefix: DEFAULT_API_PREFIX.to_owned(),
            current_user_path: DEFAULT_CURRENT_USER_PATH.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            session_stale_after: Duration::from_secs(DEFAULT_SESSION_STALE_SECS),
            login_settle_delay: Duration::from_millis(DEFAULT_LOGIN_SETTLE_MS),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

impl AuthConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional, all with defaults:
    /// - `PORTAL_API_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `PORTAL_API_PREFIX`: default `/api`
    /// - `PORTAL_CURRENT_USER_PATH`: default `/api/users/me`
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 10
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 5
    /// - `PORTAL_SESSION_STALE_SECS`: default 300
    /// - `PORTAL_LOGIN_SETTLE_MS`: default 100
    /// - `PORTAL_TOKEN_FILE`: default `.portal-auth/session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or a path value does not
    /// start with `/`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = std::env::var("PORTAL_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();
        if api_base_url.is_empty() {
            return Err(ConfigError::Empty { var: "PORTAL_API_BASE_URL" });
        }

        let api_prefix = env_path("PORTAL_API_PREFIX", DEFAULT_API_PREFIX)?;
        let current_user_path = env_path("PORTAL_CURRENT_USER_PATH", DEFAULT_CURRENT_USER_PATH)?;
        let token_file = std::env::var("PORTAL_TOKEN_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE), PathBuf::from);

        Ok(Self {
            api_base_url,
            api_prefix,
            current_user_path,
            request_timeout: Duration::from_secs(env_parse("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(env_parse("PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)),
            session_stale_after: Duration::from_secs(env_parse("PORTAL_SESSION_STALE_SECS", DEFAULT_SESSION_STALE_SECS)),
            login_settle_delay: Duration::from_millis(env_parse("PORTAL_LOGIN_SETTLE_MS", DEFAULT_LOGIN_SETTLE_MS)),
            token_file,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &'static str, default: &str) -> Result<String, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_owned());
    let value = raw.trim().trim_end_matches('/').to_owned();
    if value.is_empty() {
        return Err(ConfigError::Empty { var: key });
    }
    if !value.starts_with('/') {
        return Err(ConfigError::NotAPath { var: key, value });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

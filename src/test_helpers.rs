//! Shared fixtures for unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::routing::{get, post};
use serde_json::{Value, json};

use crate::models::{CurrentUser, Role, User};

#[must_use]
pub fn user(id: u32, username: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        username: username.to_owned(),
        full_name: format!("{username} (test)"),
        email: format!("{username}@example.com"),
        role,
        avatar_url: None,
    }
}

#[must_use]
pub fn salesperson() -> User {
    user(1, "alexneilson02", Role::Salesperson)
}

#[must_use]
pub fn contractor() -> User {
    user(2, "bobbuilds", Role::Contractor)
}

#[must_use]
pub fn admin() -> User {
    user(3, "root", Role::Admin)
}

#[must_use]
pub fn current(user: User) -> CurrentUser {
    CurrentUser { user, role_data: serde_json::json!({}) }
}

/// A fresh path under the system temp dir. The file itself is not created.
#[must_use]
pub fn temp_session_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("portal-auth-{tag}-{}-{n}", std::process::id()))
        .join("session.json")
}

// =============================================================================
// HTTP stub server
// =============================================================================

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization").and_then(|v| v.to_str().ok())
}

async fn stub_login(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
    if body["username"] == "alexneilson02" && body["password"] == "password123" {
        (
            AxumStatus::OK,
            Json(json!({
                "token": "abc",
                "user": {
                    "id": 1,
                    "username": "alexneilson02",
                    "fullName": "Alex Neilson",
                    "email": "alex@example.com",
                    "role": "salesperson"
                },
                "redirectTo": "/sales-dashboard"
            })),
        )
    } else if body["username"] == "crash" {
        (AxumStatus::INTERNAL_SERVER_ERROR, Json(json!({})))
    } else {
        (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })))
    }
}

async fn stub_me(headers: HeaderMap) -> (AxumStatus, Json<Value>) {
    if bearer(&headers) != Some("Bearer abc") {
        return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Not authenticated" })));
    }
    (
        AxumStatus::OK,
        Json(json!({
            "user": {
                "id": 1,
                "username": "alexneilson02",
                "fullName": "Alex Neilson",
                "email": "alex@example.com",
                "role": "salesperson"
            },
            "roleData": { "referralCode": "AN-0042" }
        })),
    )
}

async fn stub_logout(headers: HeaderMap) -> AxumStatus {
    if bearer(&headers) == Some("Bearer abc") { AxumStatus::NO_CONTENT } else { AxumStatus::BAD_REQUEST }
}

async fn stub_slow() -> AxumStatus {
    tokio::time::sleep(Duration::from_secs(5)).await;
    AxumStatus::OK
}

/// Serve the auth endpoints on an ephemeral port. Only `alexneilson02` /
/// `password123` logs in, and only token `abc` is accepted.
pub async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(stub_login))
        .route("/api/auth/logout", post(stub_logout))
        .route("/api/users/me", get(stub_me))
        .route("/api/slow/me", get(stub_slow));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

//! Scenario backend: an in-process stand-in for the backoffice API.
//!
//! Serves `POST /login` and `GET /me` under `/api/backoffice` with three
//! fixed accounts. Any of them logs in with the password `password123`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::auth::UserRecord;
use crate::config::MOCK_PATH;

pub const MOCK_PASSWORD: &str = "password123";

const TOKEN_PREFIX: &str = "mock_token_";

type MockResponse = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Clone)]
struct MockState {
    users: Arc<Vec<UserRecord>>,
}

fn user(
    id: i64,
    username: &str,
    real_name: &str,
    email: &str,
    name: &str,
    roles: &[&str],
) -> UserRecord {
    UserRecord {
        id,
        username: username.to_string(),
        real_name: real_name.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// The accounts the scenario backend knows about.
pub fn mock_users() -> Vec<UserRecord> {
    vec![
        user(1, "admin", "Admin Kim", "admin@test.com", "Administrator", &["admin", "user"]),
        user(2, "manager", "Manager Lee", "manager@test.com", "Manager", &["manager", "user"]),
        user(3, "user", "User Park", "user@test.com", "Regular User", &["user"]),
    ]
}

/// Build a token naming `user_id`, unique per millisecond.
fn issue_token(user_id: i64) -> String {
    format!("{}{}_{}", TOKEN_PREFIX, user_id, Utc::now().timestamp_millis())
}

/// User id named by a token from `issue_token`.
fn token_user_id(token: &str) -> Option<i64> {
    token
        .strip_prefix(TOKEN_PREFIX)?
        .split('_')
        .next()?
        .parse()
        .ok()
}

fn error_response(status: StatusCode, message: &str) -> MockResponse {
    (status, Json(json!({ "error": message })))
}

/// Router with the mock endpoints mounted under `/api/backoffice`.
pub fn router() -> Router {
    let state = MockState {
        users: Arc::new(mock_users()),
    };
    let api = Router::new()
        .route("/login", post(handle_login))
        .route("/me", get(handle_me))
        .with_state(state);
    Router::new().nest(MOCK_PATH, api)
}

/// POST /login: exchange email and password for a session.
async fn handle_login(
    State(state): State<MockState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> MockResponse {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid request: {e}"));
        }
    };

    let Some(user) = state.users.iter().find(|u| u.email == body.username) else {
        debug!(username = %body.username, "Mock login for unknown user");
        return error_response(StatusCode::NOT_FOUND, "User not found.");
    };

    if body.password != MOCK_PASSWORD {
        debug!(user_id = user.id, "Mock login with wrong password");
        return error_response(StatusCode::UNAUTHORIZED, "Incorrect password.");
    }

    (
        StatusCode::OK,
        Json(json!({
            "user": user,
            "access_token": issue_token(user.id),
        })),
    )
}

/// GET /me: resolve the bearer token to its user.
async fn handle_me(State(state): State<MockState>, headers: HeaderMap) -> MockResponse {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return error_response(StatusCode::UNAUTHORIZED, "Authentication token required.");
    };

    let Some(user_id) = token_user_id(token) else {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid token.");
    };

    match state.users.iter().find(|u| u.id == user_id) {
        Some(user) => (StatusCode::OK, Json(json!({ "user": user }))),
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid token."),
    }
}

/// Serve the scenario backend on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .context("Mock backend stopped")
}

/// A scenario backend running on a background task.
pub struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind `addr` (use port 0 for an ephemeral port) and start serving.
    pub async fn spawn(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind mock backend to {addr}"))?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener).await {
                error!(error = %e, "Mock backend failed");
            }
        });
        info!(%addr, "Mock backend listening");
        Ok(Self { addr, handle })
    }

    /// `http://host:port`, without a path.
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL the backoffice client should use.
    pub fn base_url(&self) -> String {
        format!("{}{}", self.origin(), MOCK_PATH)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

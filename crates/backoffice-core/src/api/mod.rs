//! REST API client module for the backoffice service.
//!
//! The backoffice exposes two endpoints under its base address:
//! - `POST /login` exchanges credentials for a user record and bearer token
//! - `GET /me` confirms that a bearer token is still accepted
//!
//! `BackofficeApi` is the seam the session flows depend on; `BackofficeClient`
//! is the HTTP implementation.

pub mod client;
pub mod error;

use async_trait::async_trait;

use crate::auth::{SessionData, UserRecord};

pub use client::BackofficeClient;
pub use error::{ApiError, FailureKind};

#[async_trait]
pub trait BackofficeApi: Send + Sync {
    /// Exchange credentials for a new session. Sent without a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<SessionData, ApiError>;

    /// Ask the backend who `token` belongs to.
    async fn whoami(&self, token: &str) -> Result<UserRecord, ApiError>;
}

//! Core library for the backoffice session client.
//!
//! This crate holds everything that is not terminal I/O:
//! - `storage`: directory-backed key/value storage
//! - `auth`: the persisted session slot, the startup bootstrap and the
//!   login/logout controller
//! - `api`: the HTTP client for the backoffice API
//! - `mock`: an in-process scenario backend mirroring the real API
//! - `todo`: the todo-list model
//! - `config`: endpoint resolution and the user config file

pub mod api;
pub mod auth;
pub mod config;
pub mod mock;
pub mod storage;
pub mod todo;

pub use api::{ApiError, BackofficeApi, BackofficeClient};
pub use auth::{
    BootstrapOutcome, Bootstrapper, LoginError, Prompter, RetryPolicy, SessionController,
    SessionData, SessionStore, UserRecord,
};
pub use config::{Config, Endpoint, EndpointInputs};
pub use storage::LocalStorage;

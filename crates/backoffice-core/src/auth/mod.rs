//! Authentication module for the single backoffice session.
//!
//! This module provides:
//! - `SessionStore`: the one persisted (user, token) slot
//! - `Bootstrapper`: startup restoration and token validation with retry
//! - `SessionController`: the login and logout flows

pub mod bootstrap;
pub mod controller;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap::{Backoff, BootstrapOutcome, BootstrapState, Bootstrapper, RetryPolicy};
pub use controller::{LoginError, Prompter, SessionController};
pub use session::{SessionData, SessionStore, UserRecord};

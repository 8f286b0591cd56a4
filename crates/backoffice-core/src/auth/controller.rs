//! Login/logout state for the backoffice session.
//!
//! `SessionController` owns what the login form shows: the current user,
//! the credential fields, the `submitting` flag and whether the login form
//! is open. A "reload" throws all of that away and runs the bootstrap again
//! from a clean slate.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use super::{
    BootstrapOutcome, BootstrapState, Bootstrapper, RetryPolicy, SessionData, SessionStore,
    UserRecord,
};
use crate::api::{ApiError, BackofficeApi};
use crate::storage::StorageError;

pub const CREDENTIALS_REQUIRED_MESSAGE: &str = "Please enter your backoffice ID and password.";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";
pub const LOGOUT_CONFIRM_MESSAGE: &str = "Do you want to log out?";

/// Blocking user interaction: the alert box and the yes/no dialog.
pub trait Prompter: Send + Sync {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Username and password required")]
    Validation,

    #[error("Login request failed: {0}")]
    Request(#[from] ApiError),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

pub struct SessionController {
    store: SessionStore,
    api: Arc<dyn BackofficeApi>,
    prompter: Arc<dyn Prompter>,
    policy: RetryPolicy,
    bootstrapper: Bootstrapper,

    pub username: String,
    pub password: String,
    submitting: watch::Sender<bool>,
    modal_open: bool,
    current_user: Option<UserRecord>,
    reloads: u32,
}

impl SessionController {
    pub fn new(
        store: SessionStore,
        api: Arc<dyn BackofficeApi>,
        prompter: Arc<dyn Prompter>,
        policy: RetryPolicy,
    ) -> Self {
        let bootstrapper = Bootstrapper::new(store.clone(), api.clone(), policy);
        Self {
            store,
            api,
            prompter,
            policy,
            bootstrapper,
            username: String::new(),
            password: String::new(),
            submitting: watch::Sender::new(false),
            modal_open: false,
            current_user: None,
            reloads: 0,
        }
    }

    pub fn current_user(&self) -> Option<&UserRecord> {
        self.current_user.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        *self.submitting.borrow()
    }

    /// Follow the `submitting` flag, e.g. to disable a form while a login
    /// request is in flight.
    pub fn watch_submitting(&self) -> watch::Receiver<bool> {
        self.submitting.subscribe()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn open_modal(&mut self) {
        self.modal_open = true;
    }

    pub fn close_modal(&mut self) {
        self.modal_open = false;
    }

    /// How many times the client state has been reloaded.
    pub fn reload_count(&self) -> u32 {
        self.reloads
    }

    pub fn bootstrap_history(&self) -> &[BootstrapState] {
        self.bootstrapper.history()
    }

    /// Run the startup bootstrap. Only the first call does any work.
    pub async fn mount(&mut self) -> BootstrapOutcome {
        let outcome = self.bootstrapper.run().await;
        if let BootstrapOutcome::Valid(ref user) = outcome {
            self.current_user = Some(user.clone());
        }
        outcome
    }

    /// Discard all in-memory state and bootstrap again from storage.
    pub async fn reload(&mut self) -> BootstrapOutcome {
        self.reloads += 1;
        self.current_user = None;
        self.username.clear();
        self.password.clear();
        self.submitting.send_replace(false);
        self.modal_open = false;
        self.bootstrapper = Bootstrapper::new(self.store.clone(), self.api.clone(), self.policy);
        info!(reloads = self.reloads, "Reloading client state");
        self.mount().await
    }

    /// Submit the credential fields.
    ///
    /// Every failure is also reported through the prompter; on failure no
    /// stored or in-memory session state changes.
    pub async fn submit_login(&mut self) -> Result<UserRecord, LoginError> {
        if self.username.is_empty() || self.password.is_empty() {
            self.prompter.alert(CREDENTIALS_REQUIRED_MESSAGE);
            return Err(LoginError::Validation);
        }

        self.submitting.send_replace(true);
        let result = self.request_session().await;
        self.submitting.send_replace(false);

        match result {
            Ok(session) => {
                info!(user_id = session.user.id, "Login successful");
                self.current_user = Some(session.user.clone());
                self.username.clear();
                self.password.clear();
                self.modal_open = false;
                self.reload().await;
                Ok(session.user)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.prompter.alert(LOGIN_FAILED_MESSAGE);
                Err(e)
            }
        }
    }

    async fn request_session(&self) -> Result<SessionData, LoginError> {
        let session = self.api.login(&self.username, &self.password).await?;
        self.store.save(&session)?;
        Ok(session)
    }

    /// Ask for confirmation, then drop the session. Returns whether the user
    /// confirmed.
    pub async fn logout(&mut self) -> Result<bool, StorageError> {
        if !self.prompter.confirm(LOGOUT_CONFIRM_MESSAGE) {
            return Ok(false);
        }

        let cleared = self.store.clear();
        self.current_user = None;
        cleared?;
        info!("Logged out");
        self.reload().await;
        Ok(true)
    }
}

//! Scripted collaborators for exercising the session flows in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use super::session::tests::{admin, admin_session};
use super::{Prompter, SessionData, SessionStore, UserRecord};
use crate::api::{ApiError, BackofficeApi};

/// Fake backend whose identity check fails a set number of times.
pub(crate) struct ScriptedApi {
    whoami_failures: usize,
    whoami_user: UserRecord,
    login_result: Option<SessionData>,
    whoami_calls: AtomicUsize,
    login_calls: AtomicUsize,
    whoami_times: Mutex<Vec<Instant>>,
    tokens: Mutex<Vec<String>>,
    store_probe: Option<SessionStore>,
    store_present: Mutex<Vec<bool>>,
    submitting: Mutex<Option<watch::Receiver<bool>>>,
    submitting_seen: Mutex<Vec<bool>>,
}

impl ScriptedApi {
    pub(crate) fn failing_first(failures: usize) -> Self {
        Self {
            whoami_failures: failures,
            whoami_user: admin(),
            login_result: Some(admin_session()),
            whoami_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            whoami_times: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            store_probe: None,
            store_present: Mutex::new(Vec::new()),
            submitting: Mutex::new(None),
            submitting_seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always_ok() -> Self {
        Self::failing_first(0)
    }

    pub(crate) fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub(crate) fn with_whoami_user(mut self, user: UserRecord) -> Self {
        self.whoami_user = user;
        self
    }

    pub(crate) fn with_login_rejected(mut self) -> Self {
        self.login_result = None;
        self
    }

    pub(crate) fn with_store_probe(mut self, store: SessionStore) -> Self {
        self.store_probe = Some(store);
        self
    }

    /// Record the controller's `submitting` flag at every login call.
    pub(crate) fn observe_submitting(&self, flag: watch::Receiver<bool>) {
        *self.submitting.lock().unwrap() = Some(flag);
    }

    pub(crate) fn submitting_at_login(&self) -> Vec<bool> {
        self.submitting_seen.lock().unwrap().clone()
    }

    pub(crate) fn whoami_calls(&self) -> usize {
        self.whoami_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn whoami_times(&self) -> Vec<Instant> {
        self.whoami_times.lock().unwrap().clone()
    }

    pub(crate) fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub(crate) fn store_present_at_calls(&self) -> Vec<bool> {
        self.store_present.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackofficeApi for ScriptedApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<SessionData, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref flag) = *self.submitting.lock().unwrap() {
            self.submitting_seen.lock().unwrap().push(*flag.borrow());
        }
        self.login_result
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("bad credentials".to_string()))
    }

    async fn whoami(&self, token: &str) -> Result<UserRecord, ApiError> {
        let call = self.whoami_calls.fetch_add(1, Ordering::SeqCst);
        self.whoami_times.lock().unwrap().push(Instant::now());
        self.tokens.lock().unwrap().push(token.to_string());
        if let Some(ref store) = self.store_probe {
            let present = store.load().unwrap().is_some();
            self.store_present.lock().unwrap().push(present);
        }

        if call < self.whoami_failures {
            Err(ApiError::Unauthorized("invalid token".to_string()))
        } else {
            Ok(self.whoami_user.clone())
        }
    }
}

/// Prompter that records alerts and answers confirmations with a fixed reply.
pub(crate) struct ScriptedPrompter {
    answer: bool,
    alerts: Mutex<Vec<String>>,
    confirms: AtomicUsize,
}

impl ScriptedPrompter {
    pub(crate) fn answering(answer: bool) -> Self {
        Self {
            answer,
            alerts: Mutex::new(Vec::new()),
            confirms: AtomicUsize::new(0),
        }
    }

    pub(crate) fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn confirms(&self) -> usize {
        self.confirms.load(Ordering::SeqCst)
    }
}

impl Prompter for ScriptedPrompter {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

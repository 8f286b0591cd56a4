//! Startup restoration of the persisted session.
//!
//! The bootstrapper runs once per start: it loads the stored session,
//! confirms the token with the backend, and either keeps the session or
//! evicts it once the retry budget is spent.
//!
//! ```text
//! Idle -> Loading -> LoggedOut
//!                 -> Validating -> Valid
//!                 -> Validating -> RetryPending -> Validating -> ... -> Invalid
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{SessionStore, UserRecord};
use crate::api::BackofficeApi;

/// Default number of validation retries after the first failure.
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default delay before a validation retry.
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Delay before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every retry, starting from `initial`
    Exponential { initial: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::Fixed(Duration::from_millis(DEFAULT_RETRY_DELAY_MS)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn base_delay(&self) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial } => initial,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                initial.saturating_mul(factor)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    Loading,
    /// Identity check in flight; `attempt` counts from 1
    Validating { attempt: u32 },
    /// A validation failed; `retries` is the failure count so far
    RetryPending { retries: u32 },
    LoggedOut,
    Valid,
    Invalid,
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapState::LoggedOut | BootstrapState::Valid | BootstrapState::Invalid
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Nothing usable was stored
    LoggedOut,
    /// The stored token was accepted; carries the stored user
    Valid(UserRecord),
    /// Validation kept failing and the stored session was evicted
    Invalid,
}

impl BootstrapOutcome {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            BootstrapOutcome::Valid(user) => Some(user),
            _ => None,
        }
    }
}

pub struct Bootstrapper {
    store: SessionStore,
    api: Arc<dyn BackofficeApi>,
    policy: RetryPolicy,
    state: BootstrapState,
    history: Vec<BootstrapState>,
    outcome: Option<BootstrapOutcome>,
}

impl Bootstrapper {
    pub fn new(store: SessionStore, api: Arc<dyn BackofficeApi>, policy: RetryPolicy) -> Self {
        Self {
            store,
            api,
            policy,
            state: BootstrapState::Idle,
            history: vec![BootstrapState::Idle],
            outcome: None,
        }
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[BootstrapState] {
        &self.history
    }

    pub fn outcome(&self) -> Option<&BootstrapOutcome> {
        self.outcome.as_ref()
    }

    fn transition(&mut self, next: BootstrapState) {
        debug!(from = ?self.state, to = ?next, "Bootstrap transition");
        self.state = next.clone();
        self.history.push(next);
    }

    fn finish(&mut self, outcome: BootstrapOutcome) -> BootstrapOutcome {
        let terminal = match outcome {
            BootstrapOutcome::LoggedOut => BootstrapState::LoggedOut,
            BootstrapOutcome::Valid(_) => BootstrapState::Valid,
            BootstrapOutcome::Invalid => BootstrapState::Invalid,
        };
        self.transition(terminal);
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Restore and validate the stored session.
    ///
    /// Never fails: storage and network problems end in a terminal state.
    /// Calling this again returns the first outcome without doing any I/O.
    pub async fn run(&mut self) -> BootstrapOutcome {
        if let Some(ref outcome) = self.outcome {
            debug!("Bootstrap already finished");
            return outcome.clone();
        }

        self.transition(BootstrapState::Loading);
        let session = match self.store.load_or_evict() {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("No stored session");
                return self.finish(BootstrapOutcome::LoggedOut);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                return self.finish(BootstrapOutcome::LoggedOut);
            }
        };

        let mut retries = 0;
        loop {
            self.transition(BootstrapState::Validating {
                attempt: retries + 1,
            });

            match self.api.whoami(&session.access_token).await {
                Ok(_) => {
                    info!(
                        user_id = session.user.id,
                        name = session.user.display_name(),
                        "Restored session"
                    );
                    return self.finish(BootstrapOutcome::Valid(session.user));
                }
                Err(e) => {
                    retries += 1;
                    warn!(
                        error = %e,
                        kind = ?e.failure_kind(),
                        attempt = retries,
                        max_attempts = self.policy.max_retries + 1,
                        "Token validation failed"
                    );
                    self.transition(BootstrapState::RetryPending { retries });

                    if retries > self.policy.max_retries {
                        if let Err(e) = self.store.clear() {
                            error!(error = %e, "Failed to evict stored session");
                        }
                        info!(attempts = retries, "Logged out after repeated validation failures");
                        return self.finish(BootstrapOutcome::Invalid);
                    }

                    let delay = self.policy.delay_for(retries);
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying token validation");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

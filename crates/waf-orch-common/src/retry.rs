//! Change-token retryer.
//!
//! Every WAF mutation needs a change token that is valid only until the
//! next mutation in its scope commits. When two clients race, the loser's
//! token goes stale; the fix is to fetch a new token and reissue the call.
//! [`WafRetryer`] does that with bounded exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use thiserror::Error;
use waf_api::{WafApi, WafError, WafResult};
use waf_types::{ChangeToken, TokenScope};

/// Capability for issuing change tokens.
///
/// Every [`WafApi`] is a token source; tests can supply a bare fake.
pub trait ChangeTokenSource {
    /// Issues a new change token for `scope`.
    fn acquire_token(&self, scope: &TokenScope) -> WafResult<ChangeToken>;
}

impl<T: WafApi + ?Sized> ChangeTokenSource for T {
    fn acquire_token(&self, scope: &TokenScope) -> WafResult<ChangeToken> {
        self.get_change_token(scope)
    }
}

/// Attempt budget and backoff parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for each later attempt.
    pub base_backoff: Duration,
    /// Upper bound on the exponential part of the wait.
    pub max_backoff: Duration,
    /// Upper bound on the random delay added to every wait.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries up to `max_attempts` times without waiting.
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Returns the exponential part of the wait after `attempt` failed
    /// attempts: `base * 2^(attempt - 1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    fn wait(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Error returned when a mutation could not be completed.
#[derive(Debug, Clone, Error)]
pub enum RetryError {
    /// The call failed with a non-retryable error.
    #[error("{operation} failed: {source}")]
    Fatal {
        operation: String,
        #[source]
        source: WafError,
    },

    /// The call kept failing with retryable errors until the budget ran out.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: WafError,
    },
}

impl RetryError {
    /// Returns the last error reported by the service.
    pub fn waf_error(&self) -> &WafError {
        match self {
            Self::Fatal { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    /// Returns true if the service reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        self.waf_error().is_not_found()
    }
}

/// Sleep implementation used between attempts.
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Runs WAF mutations with a fresh change token per attempt.
///
/// The retryer does not serialise callers locally; concurrent mutators in
/// the same scope are detected by the service rejecting stale tokens.
pub struct WafRetryer<'a, S: ?Sized> {
    source: &'a S,
    scope: TokenScope,
    policy: RetryPolicy,
    sleep: SleepFn,
}

impl<'a, S: ChangeTokenSource + ?Sized> WafRetryer<'a, S> {
    /// Creates a retryer issuing tokens from `source` in `scope`.
    pub fn new(source: &'a S, scope: TokenScope) -> Self {
        Self {
            source,
            scope,
            policy: RetryPolicy::default(),
            sleep: Arc::new(std::thread::sleep),
        }
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the sleep used between attempts.
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    /// Returns the scope tokens are issued in.
    pub fn scope(&self) -> &TokenScope {
        &self.scope
    }

    /// Runs `mutation` with a new change token, retrying on retryable
    /// errors.
    ///
    /// Each attempt acquires its own token; a token is never reused. Token
    /// acquisition failures are classified like mutation failures.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Fatal`] on the first non-retryable error and
    /// [`RetryError::Exhausted`] once `max_attempts` attempts have failed.
    pub fn retry_with_token<T, F>(&self, operation: &str, mut mutation: F) -> Result<T, RetryError>
    where
        F: FnMut(&ChangeToken) -> WafResult<T>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = self.source.acquire_token(&self.scope).and_then(|token| {
                debug!("{}: attempt {} with change token {}", operation, attempt, token);
                mutation(&token)
            });

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(RetryError::Fatal {
                    operation: operation.to_string(),
                    source: err,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    "{}: giving up after {} attempts: {}",
                    operation, attempt, err
                );
                return Err(RetryError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }

            let wait = self.policy.wait(attempt);
            warn!(
                "{}: attempt {}/{} failed with {}, retrying in {:?}",
                operation, attempt, max_attempts, err, wait
            );
            (self.sleep)(wait);
        }
    }
}

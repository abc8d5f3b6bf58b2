//! Sequential mirror failover
//!
//! One loop shared by every resolution client:
//!
//! 1. Ask the reliability store for the ranked mirror list
//! 2. For each mirror in order, run the attempt under a timeout and validate it
//! 3. First validated success: record success, return (remaining mirrors untouched)
//! 4. Otherwise record failure and sleep the inter-attempt delay before the next mirror
//! 5. No mirror left: [`FailoverOutcome::Exhausted`]
//!
//! Mirrors are never attempted in parallel for one logical request. The loop
//! observes cancellation during attempts and delays; a cancelled attempt is
//! not reported as a mirror failure.

use crate::reliability::ReliabilityStore;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why one mirror attempt failed
///
/// All variants are penalized identically by the reliability store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Attempt exceeded its time budget
    #[error("timed out")]
    Timeout,

    /// Connection refused, TLS failure, reset, ...
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success (or unexpected) HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response arrived but failed validation
    #[error("invalid response: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

/// Timing for one kind of resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Upper bound on a single mirror attempt
    pub attempt_timeout: Duration,
    /// Pause before moving on to the next mirror
    pub inter_attempt_delay: Duration,
}

impl FailoverPolicy {
    /// Defaults per resolution kind live in [`crate::config::TimeoutConfig`]
    pub const fn new(attempt_timeout: Duration, inter_attempt_delay: Duration) -> Self {
        Self {
            attempt_timeout,
            inter_attempt_delay,
        }
    }
}

/// Result of one failover run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverOutcome<T> {
    /// A mirror produced a validated value
    Resolved { mirror: String, value: T },
    /// Every ranked mirror was tried and failed
    Exhausted { attempts: usize },
    /// Caller cancelled before a mirror succeeded
    Cancelled,
}

impl<T> FailoverOutcome<T> {
    /// Transform the resolved value, keeping the mirror
    pub fn map_value<U>(self, f: impl FnOnce(T) -> U) -> FailoverOutcome<U> {
        match self {
            FailoverOutcome::Resolved { mirror, value } => FailoverOutcome::Resolved {
                mirror,
                value: f(value),
            },
            FailoverOutcome::Exhausted { attempts } => FailoverOutcome::Exhausted { attempts },
            FailoverOutcome::Cancelled => FailoverOutcome::Cancelled,
        }
    }

    /// Resolved value, dropping the mirror
    pub fn into_value(self) -> Option<T> {
        match self {
            FailoverOutcome::Resolved { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Runs attempts across ranked mirrors and feeds outcomes back to the store
#[derive(Clone)]
pub struct FailoverExecutor {
    store: Arc<ReliabilityStore>,
}

impl FailoverExecutor {
    pub fn new(store: Arc<ReliabilityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ReliabilityStore> {
        &self.store
    }

    /// Failover where the attempt performs its own validation
    pub async fn execute<T, F, Fut>(
        &self,
        label: &str,
        policy: FailoverPolicy,
        cancel: &CancellationToken,
        attempt: F,
    ) -> FailoverOutcome<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        self.execute_validated(label, policy, cancel, attempt, |_: &T| Ok(()))
            .await
    }

    /// Failover over the current ranking with a separate validation predicate
    pub async fn execute_validated<T, F, Fut, V>(
        &self,
        label: &str,
        policy: FailoverPolicy,
        cancel: &CancellationToken,
        attempt: F,
        validate: V,
    ) -> FailoverOutcome<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
        V: Fn(&T) -> Result<(), AttemptError>,
    {
        let mirrors = self.store.ranked_mirrors().await;
        self.execute_over(label, mirrors, policy, cancel, attempt, validate)
            .await
    }

    /// Failover over an explicit mirror order
    pub async fn execute_over<T, F, Fut, V>(
        &self,
        label: &str,
        mirrors: Vec<String>,
        policy: FailoverPolicy,
        cancel: &CancellationToken,
        mut attempt: F,
        validate: V,
    ) -> FailoverOutcome<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
        V: Fn(&T) -> Result<(), AttemptError>,
    {
        let total = mirrors.len();
        if total == 0 {
            warn!(label, "No mirrors available");
            return FailoverOutcome::Exhausted { attempts: 0 };
        }

        for (index, mirror) in mirrors.into_iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(label, "Failover cancelled before attempt");
                return FailoverOutcome::Cancelled;
            }

            let started = Instant::now();
            debug!(label, mirror = %mirror, attempt = index + 1, total, "Trying mirror");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(label, mirror = %mirror, "Failover cancelled during attempt");
                    return FailoverOutcome::Cancelled;
                }
                result = tokio::time::timeout(policy.attempt_timeout, attempt(mirror.clone())) => {
                    match result {
                        Ok(inner) => inner,
                        Err(_) => Err(AttemptError::Timeout),
                    }
                }
            };

            let result = result.and_then(|value| validate(&value).map(|()| value));
            let elapsed_ms = started.elapsed().as_millis();

            match result {
                Ok(value) => {
                    self.store.record_success(&mirror).await;
                    debug!(label, mirror = %mirror, elapsed_ms, "Mirror succeeded");
                    return FailoverOutcome::Resolved { mirror, value };
                }
                Err(err) => {
                    self.store.record_failure(&mirror).await;
                    warn!(
                        label,
                        mirror = %mirror,
                        attempt = index + 1,
                        total,
                        elapsed_ms,
                        error = %err,
                        "Mirror attempt failed"
                    );
                }
            }

            if index + 1 < total && !policy.inter_attempt_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(label, "Failover cancelled during backoff");
                        return FailoverOutcome::Cancelled;
                    }
                    _ = tokio::time::sleep(policy.inter_attempt_delay) => {}
                }
            }
        }

        info!(label, attempts = total, "All mirrors exhausted");
        FailoverOutcome::Exhausted { attempts: total }
    }
}

//! Retry policy for calls that cross an external boundary.
//!
//! Components that talk to an embedding provider, a remote vector index, or
//! a chat model route each call through a [`RetryPolicy`]. The policy bounds
//! every attempt with an optional timeout, retries failures its predicate
//! accepts, and sleeps a jittered exponential delay between attempts. Once
//! attempts run out the last error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::error::{RagError, Result};

/// Bounded exponential backoff with jitter.
///
/// The delay before attempt `n + 1` is drawn uniformly from
/// `[min_delay, clamp(base_delay * 2^(n-1), min_delay, max_delay)]`.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::RetryPolicy;
///
/// let policy = RetryPolicy::default().with_max_attempts(3);
/// let vector = policy.run("embed", || provider.embed("hello")).await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least one is always made.
    pub max_attempts: u32,
    /// The unit the exponential schedule is measured in.
    pub base_delay: Duration,
    /// Lower bound of every delay.
    pub min_delay: Duration,
    /// Upper bound of every delay.
    pub max_delay: Duration,
    /// Draw delays uniformly below the exponential ceiling instead of using it directly.
    pub jitter: bool,
    /// Deadline for a single attempt; an expired attempt fails with [`RagError::Timeout`].
    pub attempt_timeout: Option<Duration>,
    /// Decides whether a failure is worth another attempt.
    pub retryable: fn(&RagError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(60)),
            retryable: RagError::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt with no timeout.
    pub fn none() -> Self {
        Self { max_attempts: 1, attempt_timeout: None, ..Self::default() }
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff unit and the delay bounds.
    pub fn with_backoff(mut self, base: Duration, min: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set or clear the per-attempt deadline.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Replace the retryable-error predicate.
    pub fn with_retryable(mut self, retryable: fn(&RagError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// The exponential ceiling for the delay after failed attempt `attempt` (1-based).
    fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let grown = self.base_delay.saturating_mul(factor);
        let upper = self.max_delay.max(self.min_delay);
        grown.clamp(self.min_delay, upper)
    }

    /// The delay to sleep after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.jitter || ceiling <= self.min_delay {
            return ceiling;
        }
        let low = self.min_delay.as_millis() as u64;
        let high = ceiling.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }

    /// Run `call` under this policy.
    ///
    /// `operation` names the call in logs and timeout errors. Non-retryable
    /// failures return immediately; retryable ones are attempted again until
    /// `max_attempts` is reached, after which the last error is returned.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match self.attempt_timeout {
                Some(after) => match tokio::time::timeout(after, call()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RagError::Timeout { operation: operation.to_string(), after }),
                },
                None => call().await,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.retryable)(&err) {
                return Err(err);
            }
            if attempt >= max_attempts {
                error!(operation, attempts = attempt, error = %err, "retries exhausted");
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

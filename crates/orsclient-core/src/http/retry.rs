//! Retry logic with exponential backoff for HTTP requests
//!
//! A logical request is a sequence of attempts sharing one wall-clock
//! budget. Rate-limited attempts are retried after a jittered, geometrically
//! growing delay; the budget is the only bound on the number of retries.

use std::time::Duration;
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use crate::{Error, Result};

/// Backoff configuration for rate-limited attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry, before jitter
    pub base_delay: Duration,
    /// Growth factor per retry
    pub multiplier: f64,
    /// Whether to scale each delay by a random factor in `[0.5, 1.5)`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 1.5,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the multiplier
    ///
    /// Values below `1.0`, including NaN, are treated as `1.0` so delays
    /// never shrink from one retry to the next.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Deterministic component of the delay before retry `retry` (1-based)
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        scale(self.base_delay, self.multiplier.max(1.0).powi(exponent))
    }

    /// Delay before retry `retry` (1-based), jittered when enabled
    pub fn delay<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal_delay(retry);
        if self.jitter {
            scale(nominal, rng.gen::<f64>() + 0.5)
        } else {
            nominal
        }
    }
}

/// `delay * factor`, saturating at [`Duration::MAX`]
fn scale(delay: Duration, factor: f64) -> Duration {
    if delay.is_zero() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// State of one logical request across its attempts
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    first_attempt: Instant,
    budget: Duration,
    retry_count: u32,
}

impl RequestAttempt {
    /// Start the clock for a request with the given overall budget
    pub fn start(budget: Duration) -> Self {
        Self {
            first_attempt: Instant::now(),
            budget,
            retry_count: 0,
        }
    }

    /// Time since the first attempt
    pub fn elapsed(&self) -> Duration {
        self.first_attempt.elapsed()
    }

    /// Budget left before the request times out
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// Instant at which the budget runs out, `None` if it lies beyond the clock's range
    pub fn deadline(&self) -> Option<Instant> {
        self.first_attempt.checked_add(self.budget)
    }

    /// Zero-based number of retries made so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Fail with [`Error::Timeout`] once the budget is exceeded
    pub fn check_deadline(&self) -> Result<()> {
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            return Err(self.timeout_error(elapsed));
        }
        Ok(())
    }

    /// The timeout error for this request as of now
    pub fn timeout(&self) -> Error {
        self.timeout_error(self.elapsed())
    }

    fn timeout_error(&self, elapsed: Duration) -> Error {
        Error::Timeout {
            elapsed,
            budget: self.budget,
        }
    }

    /// Decide whether `error` is retried and advance the retry counter if so
    pub fn should_retry<R: Rng + ?Sized>(
        &mut self,
        error: &Error,
        policy: &RetryPolicy,
        rng: &mut R,
    ) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::NoRetry;
        }
        self.retry_count += 1;
        RetryDecision::Retry {
            delay: policy.delay(self.retry_count, rng),
        }
    }
}

/// Sleep for `delay`, returning early with [`Error::Cancelled`] if `cancel` fires
pub async fn pause(delay: Duration, cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) => tokio::select! {
            _ = token.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

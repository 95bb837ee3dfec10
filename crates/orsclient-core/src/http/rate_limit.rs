//! Self-imposed rate limiting with a sliding window
//!
//! Keeps the send times of recent requests and holds back a new request
//! until fewer than `limit` requests were sent in the last `window`. Used
//! when a provider is configured with `queries_per_minute`.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use crate::http::retry::{pause, RequestAttempt};
use crate::Result;

/// Sliding-window request limiter
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Allow at most `limit` requests per `window`; `limit` must be non-zero
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1) as usize,
            window,
            sent: Mutex::new(VecDeque::with_capacity(limit as usize)),
        }
    }

    /// Allow at most `limit` requests per rolling minute
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Wait until a request may be sent, then record it
    ///
    /// Fails with `Timeout` instead of waiting past the request's deadline,
    /// and with `Cancelled` if `cancel` fires while waiting.
    pub async fn acquire(
        &self,
        attempt: &RequestAttempt,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        loop {
            let wait = {
                let mut sent = self.sent.lock().await;
                let now = Instant::now();
                self.evict(&mut sent, now);

                if sent.len() < self.limit {
                    sent.push_back(now);
                    return Ok(());
                }

                match sent.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            if wait > attempt.remaining() {
                return Err(attempt.timeout());
            }

            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                limit = self.limit,
                "Request window full, waiting"
            );
            pause(wait, cancel).await?;
        }
    }

    /// Number of requests recorded in the current window
    pub async fn in_window(&self) -> usize {
        let mut sent = self.sent.lock().await;
        self.evict(&mut sent, Instant::now());
        sent.len()
    }

    fn evict(&self, sent: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = sent.front() {
            if now.duration_since(*oldest) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }
    }
}

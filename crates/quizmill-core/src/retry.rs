//! Bounded retry with a fixed delay.
//!
//! The question backend intermittently returns failures or empty payloads;
//! the loader retries a fixed number of times with a flat (non-exponential)
//! delay between attempts. The whole loop is cancellable via a token so a
//! caller abandoning the attempt does not leave a sleeping task writing
//! stale state afterwards.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Retry policy: total attempt count and the fixed delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (not "retries").
    pub max_attempts: u32,
    /// Flat delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 4 total attempts, 3 s apart: the question service's observed
        // warm-up behavior.
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(3),
        }
    }
}

/// Why a retried operation did not produce a value.
#[derive(Debug)]
pub enum RetryError {
    /// The cancellation token fired.
    Cancelled,
    /// Every attempt failed.
    Exhausted {
        attempts: u32,
        last_error: anyhow::Error,
    },
}

impl RetryPolicy {
    /// Run `op` until it succeeds, the attempt budget runs out, or the
    /// token is cancelled. The delay applies between attempts only.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts.max(1) {
            if attempt > 1 {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                result = op() => result,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(attempt, max = self.max_attempts, "attempt failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts.max(1),
            last_error: last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made")),
        })
    }
}

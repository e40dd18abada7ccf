// Retry policy for batch execution.
//
// Doubling backoff capped at `max_delay`. A server-provided Retry-After
// (surfaced as `Error::Throttled`) takes precedence over the computed delay.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Error;

/// How often and how patiently to retry a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Default: 10.
    pub max_attempts: u32,

    /// Delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `min(initial * 2^attempt, max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            attempt += 1;
            if attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(err);
                }
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = match &err {
                Error::Throttled {
                    retry_after_secs, ..
                } if *retry_after_secs > 0 => {
                    Duration::from_secs(*retry_after_secs)
                }
                _ => self.delay_for(attempt - 1),
            };

            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis(),
                error = %err,
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

//! Retry for idempotent reads.
//!
//! Only lookups with no side effects go through [`RetryPolicy::run`]: public
//! key resolution, transaction lookups and relay fetches. Broadcasting a
//! transaction never does, since a repeated broadcast spends funds twice.

use crate::config::RetryConfig;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed number of attempts spaced by a fixed delay, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(operation = label, attempt, error = %e, "transient failure, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Bounded retry for remote directory calls
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Network error, HTTP 429, HTTP 5xx | Retry with linear backoff |
//! | HTTP 404, other 4xx, decode error | Fail immediately |
//! | Malformed pagination cursor | Fail immediately |
//! | Attempts exhausted | `EchoError::PermanentFailure` |

use crate::config::CrawlerConfig;
use crate::{DirectoryResult, EchoError};
use std::future::Future;
use std::time::Duration;

/// How many times and how patiently a remote call is attempted
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_fetch_retries,
            Duration::from_millis(config.retry_backoff),
        )
    }

    /// Runs `op` until it succeeds, fails non-transiently, or runs out of attempts
    ///
    /// The delay before attempt `n + 1` is `backoff * n`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, EchoError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DirectoryResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e.into()),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        "{} failed after {} attempts: {}",
                        operation,
                        attempt,
                        e
                    );
                    return Err(EchoError::PermanentFailure {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff * attempt;
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

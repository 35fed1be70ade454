//! Retry utilities for backend calls.
//!
//! Retry decisions are made on [`ErrorKind`], never on error messages.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{AppError, ErrorKind};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
    /// Multiplier applied per attempt. `1.0` gives a fixed delay.
    pub backoff_multiplier: f64,
    /// Error kinds that are worth another attempt.
    pub retry_on: Vec<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            retry_on: vec![ErrorKind::Cancelled, ErrorKind::Transport],
        }
    }
}

impl RetryConfig {
    /// Exactly one retry after a fixed delay, and only for auto-cancelled
    /// requests.
    pub fn autocancel(delay: Duration) -> Self {
        Self {
            max_retries: 1,
            initial_backoff: delay,
            max_backoff: delay,
            backoff_multiplier: 1.0,
            retry_on: vec![ErrorKind::Cancelled],
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff.as_millis() as f64) as u64;
        Duration::from_millis(backoff_ms)
    }

    pub fn is_retryable(&self, err: &AppError) -> bool {
        self.retry_on.contains(&err.kind())
    }
}

/// Errors no retry policy should ever repeat.
pub fn is_permanent_failure(err: &AppError) -> bool {
    match err.kind() {
        ErrorKind::Validation | ErrorKind::Unauthorized | ErrorKind::Configuration => true,
        ErrorKind::Server => err.status().is_some_and(|s| (400..500).contains(&s)),
        _ => false,
    }
}

/// Run `f` until it succeeds, fails permanently, or retries run out.
///
/// `f` receives the zero-based attempt number so callers can vary the
/// request (for instance a fresh cancellation key) between attempts.
pub async fn retry_call<F, Fut, T>(config: &RetryConfig, operation_name: &str, mut f: F) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;

    loop {
        match f(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= config.max_retries {
                    if attempt > 0 {
                        warn!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            kind = ?err.kind(),
                            error = %err,
                            "Call failed after max retries"
                        );
                    }
                    return Err(err);
                }

                if is_permanent_failure(&err) || !config.is_retryable(&err) {
                    return Err(err);
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    kind = ?err.kind(),
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "Call failed, retrying after backoff"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

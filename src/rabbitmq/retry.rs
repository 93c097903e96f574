//! Bounded, fixed-delay retry used while establishing the broker session.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, warn};

use super::errors::{RabbitMQError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// How many times to try, how long to wait in between, and how long one try may take.
///
/// `attempt_timeout` is enforced by the caller's attempt, which knows what to
/// tear down when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempt_timeout,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        )
    }
}

/// Runs `attempt` until it succeeds or `policy.max_attempts` tries have failed.
///
/// The closure receives the 1-based attempt number. There is no sleep after
/// the final failure; the caller gets a `ConnectionError` straight away.
pub async fn retry_with_fixed_delay<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        let err = match attempt(attempts).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        warn!(
            attempt = attempts,
            max_attempts,
            error = %err,
            "Failed to connect to RabbitMQ, retrying... ({}/{})",
            attempts,
            max_attempts
        );

        if attempts >= max_attempts {
            error!("Max reconnection attempts reached. Giving up.");
            return Err(RabbitMQError::retries_exhausted(attempts, &err));
        }

        sleep(policy.delay).await;
    }
}

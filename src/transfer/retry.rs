//! Bounded retry with a fixed pause between attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::TransferFailure;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Retry straight away, without pausing.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Each attempt and each pause races against `cancel`; a cancelled run
/// returns a `Cancelled` failure without starting further attempts.
/// The closure receives the 1-based attempt number.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    item: &str,
    mut operation: F,
) -> Result<T, TransferFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransferFailure>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if cancel.is_cancelled() {
            return Err(TransferFailure::cancelled());
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferFailure::cancelled()),
            outcome = operation(attempt) => outcome,
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(item, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                tracing::error!(
                    item,
                    attempts,
                    error = %e,
                    "Giving up after all attempts failed"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    item,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Attempt failed, retrying"
                );

                if !policy.delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(TransferFailure::cancelled()),
                        _ = sleep(policy.delay) => {}
                    }
                }
            }
        }
    }
}

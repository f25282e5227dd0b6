//! Fixed-delay retry helper and rate-limit classification for collaborator calls.
//!
//! Two cross-cutting pieces live here:
//!
//! - [`retry_with_delay`] re-invokes a fallible async operation a fixed number
//!   of times with a constant pause between attempts. No jitter, no backoff;
//!   the final error is propagated unchanged.
//! - [`guard_rate_limited`] wraps an operation in the retry helper and folds
//!   its failure into the [`AgentCallError`] taxonomy, separating provider
//!   rate limiting from generic processing failures.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Attempts made by the rate-limited call guard.
const GUARD_ATTEMPTS: usize = 3;
/// Pause between guard attempts.
const GUARD_DELAY: Duration = Duration::from_secs(2);

/// Classified failure of a guarded collaborator call.
#[derive(Debug, Error)]
pub enum AgentCallError {
    /// The provider reported rate limiting; the call may succeed later.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
    /// Any other operation failure.
    #[error("Processing failed: {0}")]
    ProcessingFailure(String),
}

/// Classification hook for collaborator errors.
///
/// The default implementation is the best-effort textual check: a failure
/// whose message contains `"rate limit"` (case-insensitive) counts as rate
/// limiting. Error types that carry a structured signal (an HTTP 429 mapped
/// into a dedicated variant) override this so classification does not depend
/// on message text.
pub trait CallFailure: std::fmt::Display {
    /// Whether this failure was caused by provider rate limiting.
    fn is_rate_limit(&self) -> bool {
        self.to_string().to_lowercase().contains("rate limit")
    }
}

impl CallFailure for String {}

/// Invoke `op` up to `attempts` times total, sleeping `delay` between attempts.
///
/// Returns the first success, or the error from the final attempt. `attempts`
/// is clamped to at least one invocation.
pub async fn retry_with_delay<T, E, F, Fut>(
    attempts: usize,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                last_error = Some(error);
                if attempt + 1 < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.expect("retry loop ran zero attempts despite clamp"))
}

/// Invoke `op` through the retry helper, classifying its failure.
///
/// Each attempt's failure is mapped into [`AgentCallError`] before the retry
/// decision, so both rate-limit and generic failures are retried
/// (`3` attempts, `2` second delay) and the final classified error is
/// returned. Classification is delegated to [`CallFailure`]; callers must not
/// assume it is exhaustive.
pub async fn guard_rate_limited<T, E, F, Fut>(mut op: F) -> Result<T, AgentCallError>
where
    E: CallFailure,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_delay(GUARD_ATTEMPTS, GUARD_DELAY, || {
        let fut = op();
        async move {
            fut.await.map_err(|error| {
                if error.is_rate_limit() {
                    AgentCallError::RateLimit(error.to_string())
                } else {
                    AgentCallError::ProcessingFailure(error.to_string())
                }
            })
        }
    })
    .await
}

//! Fixed-delay retry with a per-attempt timeout.
//!
//! Bulk asset runs are unattended and sparse: a single missing file is
//! expensive to re-discover, so the default [`RetryPolicy`] retries forever
//! with a constant pause instead of giving up. Each attempt is raced against
//! a deadline; when the deadline passes the attempt's future is dropped,
//! which cancels the underlying request.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use uuid2asset_core::download::{RetryPolicy, retry_with_timeout};
//!
//! # async fn example() {
//! let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(5));
//! let cancel = CancellationToken::new();
//! let result = retry_with_timeout(&policy, &cancel, || async { Ok::<_, std::io::Error>(42) }).await;
//! assert_eq!(result.unwrap().value, 42);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::constants::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_RETRY_DELAY};

/// When and how often to retry a failing operation.
///
/// # Default Values
///
/// - `max_attempts`: unbounded
/// - `attempt_timeout`: 30 seconds
/// - `retry_delay`: 5 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until success or cancellation.
    max_attempts: Option<NonZeroU32>,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates an unbounded policy with the given timeout and delay.
    #[must_use]
    pub fn new(attempt_timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            attempt_timeout,
            retry_delay,
        }
    }

    /// Caps the number of attempts, including the first. `0` means unbounded.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = NonZeroU32::new(max_attempts);
        self
    }

    /// Returns the attempt cap, or `None` when unbounded.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts.map(NonZeroU32::get)
    }

    /// Returns the per-attempt deadline.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Returns the pause between attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max.get())
    }
}

/// Why a single attempt did not produce a value.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// The attempt exceeded the policy's timeout and was abandoned.
    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),
    /// The operation itself failed.
    #[error("{0}")]
    Failed(E),
}

/// Terminal failure of [`retry_with_timeout`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The cancellation token fired.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },
    /// A bounded policy ran out of attempts.
    #[error("gave up after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        last_error: AttemptError<E>,
    },
}

/// A successful value plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    /// Value produced by the successful attempt.
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl<T> Attempted<T> {
    /// Number of retries (attempts after the first).
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Runs `operation` until it succeeds, retrying timeouts and errors.
///
/// Every failed attempt is logged at warn level, then the policy's fixed
/// delay is awaited before the next attempt. Cancellation is observed both
/// while an attempt is running and while waiting between attempts.
///
/// # Errors
///
/// - [`RetryError::Cancelled`] once `cancel` fires
/// - [`RetryError::Exhausted`] if the policy has a cap and it is reached
pub async fn retry_with_timeout<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<Attempted<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);

        let failure = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
            result = tokio::time::timeout(policy.attempt_timeout, operation()) => match result {
                Ok(Ok(value)) => return Ok(Attempted { value, attempts }),
                Ok(Err(e)) => AttemptError::Failed(e),
                Err(_) => AttemptError::TimedOut(policy.attempt_timeout),
            },
        };

        if policy.is_exhausted(attempts) {
            debug!(attempts, "max attempts reached");
            return Err(RetryError::Exhausted {
                attempts,
                last_error: failure,
            });
        }

        warn!(
            attempt = attempts,
            delay_ms = policy.retry_delay.as_millis(),
            error = %failure,
            "attempt failed, retrying"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
            () = tokio::time::sleep(policy.retry_delay) => {}
        }
    }
}

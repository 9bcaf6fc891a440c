//! Fixed-interval retry around a single remote call.
//!
//! Only failures the caller marks as transient are retried; anything else
//! aborts on the attempt that produced it. The interval is linear: the
//! failures this covers (role propagation, a constraint mid-transition)
//! settle within a small, bounded window.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;
use crate::scope::OperationScope;

/// Attempt budget and spacing for one retried call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Total attempts, including the first.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep between two attempts.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `operation` until it succeeds, fails with a non-transient error,
    /// or the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. Waits between
    /// attempts go through `scope`, so cancellation and the operation
    /// deadline interrupt them.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Fatal`] for a failure `should_retry` rejects,
    /// [`RetryError::Exhausted`] after the last transient failure, and
    /// [`RetryError::Interrupted`] when the scope is cancelled or times out.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        scope: &OperationScope,
        should_retry: P,
        mut operation: F,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            scope.check().map_err(RetryError::Interrupted)?;

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = %scope.operation(),
                            attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) if !should_retry(&error) => {
                    return Err(RetryError::Fatal { attempt, error });
                }
                Err(error) => {
                    let remaining = self.max_attempts.saturating_sub(attempt);
                    warn!(
                        operation = %scope.operation(),
                        object = %scope.object(),
                        attempt,
                        remaining,
                        error = %error,
                        "Transient failure"
                    );
                    if remaining == 0 {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    scope
                        .pause(self.interval)
                        .await
                        .map_err(RetryError::Interrupted)?;
                }
            }
        }
    }
}

/// A successful retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Why a retried call gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: E },
    /// A non-transient failure; no further attempt was made.
    Fatal { attempt: u32, error: E },
    /// The scope was cancelled or hit its deadline.
    Interrupted(Error),
}

//! Cancellation and deadline handling for one reconciler operation.
//!
//! Every wait inside the reconciler goes through [`OperationScope::pause`],
//! so a caller's cancellation token or an elapsed operation deadline stops
//! retries and polls promptly instead of letting them run out their budget.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Budget, Error, Operation, Result};

/// Cancellation token plus optional deadline for one operation.
#[derive(Debug, Clone)]
pub struct OperationScope {
    operation: Operation,
    object: String,
    cancel: CancellationToken,
    started: Instant,
    limit: Option<Duration>,
}

impl OperationScope {
    /// Create a scope bounded by `limit`, measured from now.
    pub fn new(
        operation: Operation,
        object: impl Into<String>,
        cancel: &CancellationToken,
        limit: Duration,
    ) -> Self {
        Self {
            operation,
            object: object.into(),
            cancel: cancel.clone(),
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    /// Create a scope bounded only by the caller's token.
    pub fn unbounded(
        operation: Operation,
        object: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            operation,
            object: object.into(),
            cancel: cancel.clone(),
            started: Instant::now(),
            limit: None,
        }
    }

    pub const fn operation(&self) -> Operation {
        self.operation
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Time since the scope was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn deadline(&self) -> Option<Instant> {
        self.limit.and_then(|limit| self.started.checked_add(limit))
    }

    fn cancelled(&self) -> Error {
        Error::Cancelled {
            operation: self.operation,
            object: self.object.clone(),
        }
    }

    fn timed_out(&self, limit: Duration) -> Error {
        Error::Timeout {
            operation: self.operation,
            object: self.object.clone(),
            budget: Budget::Deadline(limit),
        }
    }

    /// Fail if the operation was cancelled or its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or [`Error::Timeout`].
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        match (self.limit, self.deadline()) {
            (Some(limit), Some(deadline)) if Instant::now() >= deadline => {
                Err(self.timed_out(limit))
            }
            _ => Ok(()),
        }
    }

    /// Sleep for `duration`, waking early on cancellation or deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token fires first, or
    /// [`Error::Timeout`] if the operation deadline arrives first.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        let wake = Instant::now().checked_add(duration);
        let deadline = self.deadline();
        let (until, hits_deadline) = match (wake, deadline) {
            (Some(wake), Some(deadline)) if deadline < wake => (Some(deadline), true),
            (Some(wake), _) => (Some(wake), false),
            (None, Some(deadline)) => (Some(deadline), true),
            (None, None) => (None, false),
        };

        let Some(until) = until else {
            self.cancel.cancelled().await;
            return Err(self.cancelled());
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(self.cancelled()),
            () = tokio::time::sleep_until(until) => {
                match self.limit {
                    Some(limit) if hits_deadline => Err(self.timed_out(limit)),
                    _ => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_full_interval() {
        let token = CancellationToken::new();
        let scope = OperationScope::new(Operation::Create, "c", &token, Duration::from_secs(60));
        let before = Instant::now();
        assert!(scope.pause(Duration::from_secs(10)).await.is_ok());
        assert_eq!(before.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_at_deadline() {
        let token = CancellationToken::new();
        let scope = OperationScope::new(Operation::Delete, "c", &token, Duration::from_secs(15));
        assert!(scope.pause(Duration::from_secs(10)).await.is_ok());

        let result = scope.pause(Duration::from_secs(10)).await;
        assert!(matches!(
            result,
            Err(Error::Timeout {
                operation: Operation::Delete,
                budget: Budget::Deadline(limit),
                ..
            }) if limit == Duration::from_secs(15)
        ));
        assert_eq!(scope.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_wakes_on_cancellation() {
        let token = CancellationToken::new();
        let scope = OperationScope::unbounded(Operation::Read, "c", &token);
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let result = scope.pause(Duration::from_secs(20)).await;
        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(scope.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_check_reports_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let scope = OperationScope::unbounded(Operation::Read, "c", &token);
        assert!(matches!(scope.check(), Err(Error::Cancelled { .. })));
    }
}

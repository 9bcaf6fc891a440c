//! Deletion-settle observation.
//!
//! The provider accepts a delete before the constraint is actually gone; it
//! stays describable (often still `AVAILABLE`) for an unknown interval. The
//! poller describes it on a fixed interval until describe reports not-found
//! or the poll deadline passes.

use std::time::Duration;

use constraint_core::{
    ConstraintId, ConstraintState, ConstraintStatus, GatewayError, GatewayResult, RemoteGateway,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Budget, Error, Operation, Result};
use crate::scope::OperationScope;

/// Where a deleted constraint stands after one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Still describable, in the reported status.
    Pending { status: ConstraintStatus },
    /// The provider reports the constraint as failed; waiting will not help.
    Failed { status: ConstraintStatus },
    /// Describe reported not-found.
    Absent,
    /// Still describable and the next poll would fall past the deadline.
    TimedOut { status: ConstraintStatus },
}

/// Summary of a completed deletion wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Describe calls made, including the one that saw not-found.
    pub polls: u32,
    pub elapsed: Duration,
}

/// Fixed-interval, deadline-bounded describe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transition for one describe result observed `elapsed` into the wait.
    ///
    /// # Errors
    ///
    /// Any describe failure other than not-found is returned as-is; it is
    /// never read as "still pending".
    pub fn observe(
        &self,
        described: GatewayResult<ConstraintState>,
        elapsed: Duration,
    ) -> std::result::Result<PollState, GatewayError> {
        match described {
            Ok(state) if state.status == ConstraintStatus::Failed => Ok(PollState::Failed {
                status: state.status,
            }),
            Ok(state) => {
                let next_poll = elapsed.saturating_add(self.interval);
                if next_poll > self.timeout {
                    Ok(PollState::TimedOut {
                        status: state.status,
                    })
                } else {
                    Ok(PollState::Pending {
                        status: state.status,
                    })
                }
            }
            Err(error) if error.is_not_found() => Ok(PollState::Absent),
            Err(error) => Err(error),
        }
    }

    /// Describe `id` until it is gone.
    ///
    /// The first describe is issued immediately; later ones are spaced by
    /// the poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the constraint is still describable at
    /// the deadline, [`Error::DeletionFailed`] as soon as the provider reports
    /// `FAILED`, the classified error for any other describe failure,
    /// and [`Error::Cancelled`]/[`Error::Timeout`] from the enclosing scope.
    pub async fn await_absence(
        &self,
        gateway: &dyn RemoteGateway,
        id: &ConstraintId,
        scope: &OperationScope,
    ) -> Result<PollReport> {
        let started = Instant::now();
        let mut polls = 0_u32;

        loop {
            scope.check()?;
            polls = polls.saturating_add(1);

            let described = gateway.describe(id).await;
            let state = self
                .observe(described, started.elapsed())
                .map_err(|e| Error::from_gateway(Operation::AwaitDeletion, id, e))?;

            match state {
                PollState::Absent => {
                    let report = PollReport {
                        polls,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        constraint_id = %id,
                        polls,
                        elapsed_ms = report.elapsed.as_millis(),
                        "Constraint no longer describable"
                    );
                    return Ok(report);
                }
                PollState::Pending { status } => {
                    debug!(constraint_id = %id, poll = polls, %status, "Deletion still pending");
                    scope.pause(self.interval).await?;
                }
                PollState::Failed { status } => {
                    warn!(constraint_id = %id, poll = polls, %status, "Deletion failed remotely");
                    return Err(Error::DeletionFailed {
                        id: id.clone(),
                        status,
                    });
                }
                PollState::TimedOut { status } => {
                    return Err(Error::Timeout {
                        operation: Operation::AwaitDeletion,
                        object: format!("constraint '{id}' (last status {status})"),
                        budget: Budget::Deadline(self.timeout),
                    });
                }
            }
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_secs(300))
    }
}

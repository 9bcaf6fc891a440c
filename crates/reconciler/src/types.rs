//! Core types for the reconciler.

use std::time::Duration;

use constraint_core::{ChangeSet, ConstraintField, ConstraintState};

/// Result of describing a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The constraint exists, as described.
    Present(ConstraintState),
    /// The provider no longer knows the constraint; the caller should drop
    /// its local state.
    Gone,
}

impl Observation {
    /// The described state, if present.
    pub fn into_state(self) -> Option<ConstraintState> {
        match self {
            Self::Present(state) => Some(state),
            Self::Gone => None,
        }
    }
}

/// Summary of a completed delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    /// Delete requests issued before one was accepted.
    pub delete_attempts: u32,
    /// Describe calls made while waiting for the constraint to disappear.
    pub polls: u32,
    /// Total time from the first delete request to confirmed absence.
    pub elapsed: Duration,
}

/// Action needed to move an observed constraint to its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing exists yet.
    Create,
    /// Only mutable fields differ.
    Update { changes: ChangeSet },
    /// A write-once field differs; destroy and recreate.
    Replace { fields: Vec<ConstraintField> },
    /// Observed matches desired.
    Noop,
}

impl ReconcileAction {
    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update { .. } => "update",
            Self::Replace { .. } => "replace",
            Self::Noop => "noop",
        }
    }
}

/// Result of applying a desired spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The action that was taken.
    pub action: ReconcileAction,
    /// State after the action.
    pub state: ConstraintState,
}

//! Error types for the reconciler crate.
//!
//! Every remote failure is classified here before it leaves the reconciler;
//! raw gateway errors only appear as the `source` of a classified variant.

use std::fmt;
use std::time::Duration;

use constraint_core::{ConstraintId, ConstraintStatus, GatewayError, GatewayErrorKind};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The reconciler operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Observing a deleted constraint until it disappears.
    AwaitDeletion,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Read => write!(f, "read"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::AwaitDeletion => write!(f, "deletion settle"),
        }
    }
}

/// The budget an operation exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// A fixed number of attempts at a fixed interval.
    Attempts { attempts: u32, interval: Duration },
    /// A wall-clock deadline.
    Deadline(Duration),
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempts { attempts, interval } => {
                write!(f, "{attempts} attempts at {interval:?} intervals")
            }
            Self::Deadline(limit) => write!(f, "{limit:?}"),
        }
    }
}

/// Reconciler error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A resource the request references has not propagated yet.
    #[error("{object}: referenced resource has not propagated yet: {source}")]
    DependencyNotReady {
        object: String,
        source: GatewayError,
    },

    #[error("constraint '{id}' not found")]
    NotFound { id: ConstraintId },

    /// The request can never succeed as sent.
    #[error("invalid {operation} request for {object}: {reason}")]
    InvalidRequest {
        operation: Operation,
        object: String,
        reason: String,
    },

    /// A retry or poll budget ran out; trying the whole operation later may
    /// still succeed.
    #[error("{operation} of {object} timed out after {budget}")]
    Timeout {
        operation: Operation,
        object: String,
        budget: Budget,
    },

    #[error("{operation} of {object} failed: {source}")]
    TransportOther {
        operation: Operation,
        object: String,
        source: GatewayError,
    },

    /// The provider accepted the delete but then reported the constraint as
    /// failed.
    #[error("deletion of constraint '{id}' failed: provider reported status {status}")]
    DeletionFailed {
        id: ConstraintId,
        status: ConstraintStatus,
    },

    #[error("{operation} of {object} cancelled")]
    Cancelled { operation: Operation, object: String },

    /// The constraint exists remotely but describing it right after creation
    /// failed.
    #[error("constraint '{id}' was created but could not be read back: {source}")]
    CreatedButUnreadable {
        id: ConstraintId,
        source: Box<Error>,
    },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Classify a failed create call.
    ///
    /// Not-found on create means a referenced resource (typically a role) is
    /// not visible to the provider yet.
    pub fn from_create_failure(object: impl Into<String>, source: GatewayError) -> Self {
        let object = object.into();
        match source.kind {
            GatewayErrorKind::NotFound => Self::DependencyNotReady { object, source },
            GatewayErrorKind::InvalidParameters => Self::InvalidRequest {
                operation: Operation::Create,
                object,
                reason: source.message,
            },
            GatewayErrorKind::Other => Self::TransportOther {
                operation: Operation::Create,
                object,
                source,
            },
        }
    }

    /// Classify a failed call against an existing constraint.
    pub fn from_gateway(operation: Operation, id: &ConstraintId, source: GatewayError) -> Self {
        match source.kind {
            GatewayErrorKind::NotFound => Self::NotFound { id: id.clone() },
            GatewayErrorKind::InvalidParameters => Self::InvalidRequest {
                operation,
                object: describe_id(id),
                reason: source.message,
            },
            GatewayErrorKind::Other => Self::TransportOther {
                operation,
                object: describe_id(id),
                source,
            },
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(
        operation: Operation,
        object: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRequest {
            operation,
            object: object.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this is the transient create-path failure.
    pub const fn is_dependency_not_ready(&self) -> bool {
        matches!(self, Self::DependencyNotReady { .. })
    }

    /// Whether repeating the whole operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DependencyNotReady { .. } | Self::Timeout { .. } | Self::Cancelled { .. } => true,
            Self::CreatedButUnreadable { source, .. } => source.is_retryable(),
            Self::TransportOther { .. }
            | Self::NotFound { .. }
            | Self::InvalidRequest { .. }
            | Self::DeletionFailed { .. }
            | Self::InvalidConfig { .. } => false,
        }
    }
}

/// Human-readable handle for an existing constraint.
pub(crate) fn describe_id(id: &ConstraintId) -> String {
    format!("constraint '{id}'")
}

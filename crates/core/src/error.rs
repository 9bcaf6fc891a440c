//! Error types for the constraint data model and the remote gateway contract.
//!
//! Two families live here:
//!
//! - [`Error`]: local failures raised before anything reaches the remote
//!   service (malformed specs, conflicting role references, bad documents).
//! - [`GatewayError`]: a remote call failure, already classified by the
//!   gateway into a [`GatewayErrorKind`].

use std::fmt;

use thiserror::Error;

use crate::types::ConstraintField;

/// Result type alias for local constraint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for remote gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Local validation and codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        field: ConstraintField,
        reason: String,
    },

    #[error("'{field}' is write-once and cannot be changed in place")]
    ImmutableField { field: ConstraintField },

    #[error("unknown constraint type '{0}'")]
    UnknownConstraintType(String),

    #[error("invalid launch parameters: {reason}")]
    InvalidLaunchParameters { reason: String },

    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },
}

impl Error {
    /// Create an invalid field error.
    pub fn invalid_field(field: ConstraintField, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Create an invalid launch parameters error.
    pub fn invalid_launch_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidLaunchParameters {
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }
}

/// Classification of a remote call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// The referenced resource does not exist (or is not visible yet).
    NotFound,
    /// The provider rejected the request parameters.
    InvalidParameters,
    /// Anything else: throttling, transport, duplicates, service faults.
    Other,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "ResourceNotFoundException"),
            Self::InvalidParameters => write!(f, "InvalidParametersException"),
            Self::Other => write!(f, "ServiceError"),
        }
    }
}

/// A classified remote call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    /// Create a gateway error of the given kind.
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a not-found failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    /// Create an invalid-parameters failure.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidParameters, message)
    }

    /// Create an unclassified failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Other, message)
    }

    /// Whether the provider reported the resource as not found.
    pub fn is_not_found(&self) -> bool {
        self.kind == GatewayErrorKind::NotFound
    }
}

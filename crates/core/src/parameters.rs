//! Parameter documents carried by constraints.
//!
//! The provider transports a constraint's parameters as an opaque JSON
//! string whose shape depends on the constraint type. [`ConstraintParameters`]
//! is that string; [`LaunchParameters`] is the typed codec for LAUNCH
//! constraints, which reference the role the product is launched as.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque, type-specific parameters document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintParameters(String);

impl ConstraintParameters {
    /// Wrap a serialized document.
    pub fn new(document: impl Into<String>) -> Self {
        Self(document.into())
    }

    /// Borrow the serialized document.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two documents carry the same content.
    ///
    /// The provider re-serializes documents, so whitespace and key order are
    /// not significant when both sides parse as JSON.
    pub fn same_document(&self, other: &Self) -> bool {
        match (
            serde_json::from_str::<serde_json::Value>(&self.0),
            serde_json::from_str::<serde_json::Value>(&other.0),
        ) {
            (Ok(left), Ok(right)) => left == right,
            _ => self.0 == other.0,
        }
    }
}

impl fmt::Display for ConstraintParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role reference of a LAUNCH constraint.
///
/// Exactly one form is ever set, which the enum makes unrepresentable
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaunchParameters {
    /// Role name resolved inside each account the product is shared with.
    #[serde(rename = "LocalRoleName")]
    LocalRoleName(String),
    /// Fully qualified role identifier.
    #[serde(rename = "RoleArn")]
    RoleArn(String),
}

/// Wire shape of a described LAUNCH document; either key may be missing
/// or empty.
#[derive(Debug, Default, Deserialize)]
struct LaunchDocument {
    #[serde(rename = "LocalRoleName", default)]
    local_role_name: Option<String>,
    #[serde(rename = "RoleArn", default)]
    role_arn: Option<String>,
}

impl LaunchParameters {
    /// Build from the two optional caller-facing fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLaunchParameters`] when both or neither of the
    /// fields are provided. Empty strings count as not provided.
    pub fn from_fields(local_role_name: Option<&str>, role_arn: Option<&str>) -> Result<Self> {
        let local_role_name = local_role_name.filter(|name| !name.is_empty());
        let role_arn = role_arn.filter(|arn| !arn.is_empty());
        match (local_role_name, role_arn) {
            (Some(name), None) => Ok(Self::LocalRoleName(name.to_string())),
            (None, Some(arn)) => Ok(Self::RoleArn(arn.to_string())),
            (Some(_), Some(_)) => Err(Error::invalid_launch_parameters(
                "both 'local_role_name' and 'role_arn' should not be provided",
            )),
            (None, None) => Err(Error::invalid_launch_parameters(
                "either 'local_role_name' or 'role_arn' should be provided",
            )),
        }
    }

    /// Serialize into the document the provider expects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParseFailed`] if serialization fails.
    pub fn encode(&self) -> Result<ConstraintParameters> {
        serde_json::to_string(self)
            .map(ConstraintParameters::new)
            .map_err(|e| Error::json_parse_failed(e.to_string()))
    }

    /// Read a described document back into a role reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParseFailed`] when the document is not JSON, and
    /// [`Error::InvalidLaunchParameters`] when it carries both or neither
    /// role reference.
    pub fn decode(parameters: &ConstraintParameters) -> Result<Self> {
        let document: LaunchDocument = serde_json::from_str(parameters.as_str())
            .map_err(|e| Error::json_parse_failed(e.to_string()))?;
        Self::from_fields(
            document.local_role_name.as_deref(),
            document.role_arn.as_deref(),
        )
    }

    /// The role name, if this is a local role reference.
    pub fn local_role_name(&self) -> Option<&str> {
        match self {
            Self::LocalRoleName(name) => Some(name),
            Self::RoleArn(_) => None,
        }
    }

    /// The role identifier, if this is a full role reference.
    pub fn role_arn(&self) -> Option<&str> {
        match self {
            Self::RoleArn(arn) => Some(arn),
            Self::LocalRoleName(_) => None,
        }
    }
}

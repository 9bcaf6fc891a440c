//! Core types for constraints: the desired spec, the observed state and the
//! change sets that flow between them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameters::ConstraintParameters;

/// Portfolio and product identifiers as issued by the provider.
static RESOURCE_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").ok());

const DESCRIPTION_MAX_CHARS: usize = 100;

/// Remote-assigned constraint identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(String);

impl ConstraintId {
    /// Wrap an identifier returned by the provider.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConstraintId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The policy kind a constraint attaches to a portfolio/product pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintType {
    Launch,
    Notification,
    ResourceUpdate,
    Stackset,
    Template,
}

impl ConstraintType {
    /// All constraint kinds, in wire order.
    pub const ALL: [Self; 5] = [
        Self::Launch,
        Self::Notification,
        Self::ResourceUpdate,
        Self::Stackset,
        Self::Template,
    ];

    /// The provider's name for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Launch => "LAUNCH",
            Self::Notification => "NOTIFICATION",
            Self::ResourceUpdate => "RESOURCE_UPDATE",
            Self::Stackset => "STACKSET",
            Self::Template => "TEMPLATE",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownConstraintType(s.to_string()))
    }
}

/// Status reported by the provider when describing a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConstraintStatus {
    Available,
    Creating,
    Failed,
    /// Any status this crate does not know about, kept verbatim.
    Other(String),
}

impl ConstraintStatus {
    /// The provider's name for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Creating => "CREATING",
            Self::Failed => "FAILED",
            Self::Other(status) => status,
        }
    }

    /// Whether the constraint has settled into its usable state.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl From<String> for ConstraintStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "AVAILABLE" => Self::Available,
            "CREATING" => Self::Creating,
            "FAILED" => Self::Failed,
            _ => Self::Other(status),
        }
    }
}

impl From<&str> for ConstraintStatus {
    fn from(status: &str) -> Self {
        Self::from(status.to_string())
    }
}

impl From<ConstraintStatus> for String {
    fn from(status: ConstraintStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ConstraintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of a constraint that a caller can ask to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintField {
    Description,
    Parameters,
    PortfolioId,
    ProductId,
    Type,
}

impl ConstraintField {
    /// Whether the field can be changed without recreating the constraint.
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Description | Self::Parameters)
    }

    /// The field's attribute name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Parameters => "parameters",
            Self::PortfolioId => "portfolio_id",
            Self::ProductId => "product_id",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for ConstraintField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a constraint, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub portfolio_id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub parameters: ConstraintParameters,
}

impl ConstraintSpec {
    /// Create a spec without a description.
    pub fn new(
        portfolio_id: impl Into<String>,
        product_id: impl Into<String>,
        constraint_type: ConstraintType,
        parameters: ConstraintParameters,
    ) -> Self {
        Self {
            description: None,
            portfolio_id: portfolio_id.into(),
            product_id: product_id.into(),
            constraint_type,
            parameters,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human-readable handle for logs and errors before an id exists.
    pub fn target(&self) -> String {
        format!(
            "{} constraint on portfolio '{}' / product '{}'",
            self.constraint_type, self.portfolio_id, self.product_id
        )
    }

    /// Check the caller-facing field rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when the description is outside 1-100
    /// characters or an identifier is empty or contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn validate(&self) -> Result<()> {
        if let Some(description) = &self.description {
            let chars = description.chars().count();
            if chars == 0 || chars > DESCRIPTION_MAX_CHARS {
                return Err(Error::invalid_field(
                    ConstraintField::Description,
                    format!("must be 1-{DESCRIPTION_MAX_CHARS} characters, got {chars}"),
                ));
            }
        }
        validate_resource_id(ConstraintField::PortfolioId, &self.portfolio_id)?;
        validate_resource_id(ConstraintField::ProductId, &self.product_id)
    }
}

fn validate_resource_id(field: ConstraintField, value: &str) -> Result<()> {
    let valid = RESOURCE_ID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value));
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_field(field, format!("invalid id format '{value}'")))
    }
}

/// Observed state of a constraint, as last described by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintState {
    pub id: ConstraintId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub status: ConstraintStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub portfolio_id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub parameters: ConstraintParameters,
}

impl ConstraintState {
    /// Placeholder state for a constraint that exists remotely but has not
    /// been described yet.
    pub fn provisional(id: ConstraintId, spec: &ConstraintSpec) -> Self {
        Self {
            id,
            owner: None,
            status: ConstraintStatus::Creating,
            description: spec.description.clone(),
            portfolio_id: spec.portfolio_id.clone(),
            product_id: spec.product_id.clone(),
            constraint_type: spec.constraint_type,
            parameters: spec.parameters.clone(),
        }
    }
}

/// Set of field changes requested against an existing constraint.
///
/// The set can hold any field; it is the consumer's job to refuse
/// write-once fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: BTreeMap<ConstraintField, String>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change to a field.
    pub fn set(&mut self, field: ConstraintField, value: impl Into<String>) {
        self.changes.insert(field, value.into());
    }

    /// Record a new description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set(ConstraintField::Description, description);
        self
    }

    /// Record a new parameters document.
    #[must_use]
    pub fn with_parameters(mut self, parameters: &ConstraintParameters) -> Self {
        self.set(ConstraintField::Parameters, parameters.as_str());
        self
    }

    /// Compute the changes needed to move `observed` to `desired`.
    pub fn between(observed: &ConstraintState, desired: &ConstraintSpec) -> Self {
        let mut changes = Self::new();
        let non_empty = |d: &Option<String>| d.clone().filter(|d| !d.is_empty());
        if non_empty(&observed.description) != non_empty(&desired.description) {
            changes.set(
                ConstraintField::Description,
                desired.description.clone().unwrap_or_default(),
            );
        }
        if !observed.parameters.same_document(&desired.parameters) {
            changes.set(ConstraintField::Parameters, desired.parameters.as_str());
        }
        if observed.portfolio_id != desired.portfolio_id {
            changes.set(ConstraintField::PortfolioId, desired.portfolio_id.clone());
        }
        if observed.product_id != desired.product_id {
            changes.set(ConstraintField::ProductId, desired.product_id.clone());
        }
        if observed.constraint_type != desired.constraint_type {
            changes.set(ConstraintField::Type, desired.constraint_type.as_str());
        }
        changes
    }

    /// Value recorded for a field, if any.
    pub fn get(&self, field: ConstraintField) -> Option<&str> {
        self.changes.get(&field).map(String::as_str)
    }

    /// Changed fields, in field order.
    pub fn fields(&self) -> impl Iterator<Item = ConstraintField> + '_ {
        self.changes.keys().copied()
    }

    /// Changed fields that can only be applied by recreating the constraint.
    pub fn immutable_fields(&self) -> Vec<ConstraintField> {
        self.fields().filter(|field| !field.is_mutable()).collect()
    }

    /// Whether no change was recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

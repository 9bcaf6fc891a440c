//! Remote gateway contract.
//!
//! The gateway is the only component that talks to the provisioning
//! service. Every failure it returns is already classified into a
//! [`GatewayErrorKind`](crate::error::GatewayErrorKind); callers never see raw
//! provider error codes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, GatewayResult, Result};
use crate::parameters::ConstraintParameters;
use crate::types::{ChangeSet, ConstraintField, ConstraintId, ConstraintSpec, ConstraintState, ConstraintType};

/// Request to create a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateConstraintRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: ConstraintParameters,
    pub portfolio_id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
}

impl From<&ConstraintSpec> for CreateConstraintRequest {
    fn from(spec: &ConstraintSpec) -> Self {
        Self {
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
            portfolio_id: spec.portfolio_id.clone(),
            product_id: spec.product_id.clone(),
            constraint_type: spec.constraint_type,
        }
    }
}

/// Request to update the mutable fields of a constraint.
///
/// Only fields that changed are present. Write-once fields have no slot
/// here, so they cannot be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConstraintRequest {
    pub id: ConstraintId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ConstraintParameters>,
}

impl UpdateConstraintRequest {
    /// Build an update request from a change set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImmutableField`] for the first write-once field found
    /// in the change set.
    pub fn from_change_set(id: ConstraintId, changes: &ChangeSet) -> Result<Self> {
        if let Some(field) = changes.immutable_fields().into_iter().next() {
            return Err(Error::ImmutableField { field });
        }
        Ok(Self {
            id,
            description: changes
                .get(ConstraintField::Description)
                .map(str::to_string),
            parameters: changes
                .get(ConstraintField::Parameters)
                .map(ConstraintParameters::new),
        })
    }

    /// Whether the request carries no change.
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.parameters.is_none()
    }
}

/// Client for the remote provisioning service.
///
/// Implementations are shared read-only across reconciliations; every call
/// is an independent request/response exchange.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Create a constraint and return its remote-assigned identifier.
    async fn create(&self, request: &CreateConstraintRequest) -> GatewayResult<ConstraintId>;

    /// Describe a constraint.
    async fn describe(&self, id: &ConstraintId) -> GatewayResult<ConstraintState>;

    /// Update the mutable fields of a constraint.
    async fn update(&self, request: &UpdateConstraintRequest) -> GatewayResult<()>;

    /// Request deletion of a constraint. Acceptance does not mean the
    /// constraint is gone yet.
    async fn delete(&self, id: &ConstraintId) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_carries_only_changed_fields() {
        let changes = ChangeSet::new().with_description("updated");
        let request = UpdateConstraintRequest::from_change_set(ConstraintId::new("cons-1"), &changes);
        assert_eq!(
            request.ok(),
            Some(UpdateConstraintRequest {
                id: ConstraintId::new("cons-1"),
                description: Some("updated".to_string()),
                parameters: None,
            })
        );
    }

    #[test]
    fn test_update_request_rejects_write_once_fields() {
        let mut changes = ChangeSet::new().with_description("updated");
        changes.set(ConstraintField::Type, "TEMPLATE");
        let request = UpdateConstraintRequest::from_change_set(ConstraintId::new("cons-1"), &changes);
        assert_eq!(
            request.err(),
            Some(Error::ImmutableField {
                field: ConstraintField::Type
            })
        );
    }

    #[test]
    fn test_create_request_serializes_wire_names() {
        let spec = ConstraintSpec::new(
            "port-1",
            "prod-1",
            ConstraintType::Launch,
            ConstraintParameters::new(r#"{"LocalRoleName":"launch"}"#),
        );
        let json = serde_json::to_value(CreateConstraintRequest::from(&spec)).ok();
        assert_eq!(
            json.as_ref().and_then(|v| v.get("type")).and_then(|v| v.as_str()),
            Some("LAUNCH")
        );
        assert!(json.as_ref().and_then(|v| v.get("description")).is_none());
    }
}

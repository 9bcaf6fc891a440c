//! Constraint data model and remote gateway contract.
//!
//! A constraint attaches a typed policy (LAUNCH, NOTIFICATION,
//! RESOURCE_UPDATE, STACKSET, TEMPLATE) to a portfolio/product pairing in a
//! remote provisioning service. This crate holds:
//!
//! - **Types**: the desired [`ConstraintSpec`], the observed
//!   [`ConstraintState`] and the [`ChangeSet`] between them
//! - **Parameters**: the opaque [`ConstraintParameters`] document and the
//!   [`LaunchParameters`] role-reference codec
//! - **Gateway**: the [`RemoteGateway`] trait every provider client implements
//! - **Simulation**: [`InMemoryGateway`], a provider stand-in with
//!   propagation and deletion lag
//!
//! # Example
//!
//! ```ignore
//! use constraint_core::{
//!     ConstraintSpec, ConstraintType, InMemoryGateway, LaunchParameters, RemoteGateway,
//!     CreateConstraintRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = InMemoryGateway::default();
//!     let params = LaunchParameters::from_fields(None, Some("arn:aws:iam::1:role/x"))?.encode()?;
//!     let spec = ConstraintSpec::new("port-1", "prod-1", ConstraintType::Launch, params);
//!     let id = gateway.create(&CreateConstraintRequest::from(&spec)).await?;
//! }
//! ```

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod gateway;
pub mod memory;
pub mod parameters;
pub mod types;

// Re-export main types
pub use error::{Error, GatewayError, GatewayErrorKind, GatewayResult, Result};
pub use gateway::{CreateConstraintRequest, RemoteGateway, UpdateConstraintRequest};
pub use memory::{CallCounts, InMemoryGateway, SimulationConfig};
pub use parameters::{ConstraintParameters, LaunchParameters};
pub use types::{
    ChangeSet, ConstraintField, ConstraintId, ConstraintSpec, ConstraintState, ConstraintStatus,
    ConstraintType,
};

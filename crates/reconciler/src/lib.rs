//! Constraint reconciliation under eventual consistency.
//!
//! The provisioning service is eventually consistent in two ways the
//! reconciler absorbs:
//!
//! - **Propagation lag**: a freshly created role is not yet visible, so
//!   creating a constraint that references it fails with not-found. Create
//!   is retried on that failure only.
//! - **Asynchronous deletion**: a delete is accepted while the constraint
//!   stays describable. Delete waits by polling until describe reports
//!   not-found.
//!
//! # Key Concepts
//!
//! ## Operations
//!
//! - [`Reconciler::create`] - retried create, then an immediate describe
//! - [`Reconciler::read`] - describe, with not-found reported as gone
//! - [`Reconciler::update`] - send changed mutable fields, then read
//! - [`Reconciler::delete`] - retried delete, then poll for absence
//!
//! ## Cancellation
//!
//! Every operation takes a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and runs under a per-operation deadline from [`ReconcilerConfig`]. Both
//! interrupt retry and poll waits; neither aborts a remote call in flight.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use constraint_core::{ConstraintSpec, ConstraintType, InMemoryGateway, LaunchParameters};
//! use constraint_reconciler::{LifecycleManager, Reconciler};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let reconciler = Reconciler::builder()
//!         .with_gateway(InMemoryGateway::new_arc(Default::default()))
//!         .build()?;
//!     let mut manager = LifecycleManager::new(Arc::new(reconciler));
//!
//!     let params = LaunchParameters::from_fields(Some("launch-role"), None)?.encode()?;
//!     let spec = ConstraintSpec::new("port-1", "prod-1", ConstraintType::Launch, params);
//!     let token = CancellationToken::new();
//!
//!     manager.apply("launch", &spec, &token).await?;
//!     manager.destroy("launch", &token).await?;
//! }
//! ```

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod reconciler;
pub mod retry;
pub mod scope;
pub mod types;

// Re-export main types
pub use config::{OperationTimeouts, PollSettings, ReconcilerConfig, RetrySettings};
pub use error::{Budget, Error, Operation, Result};
pub use lifecycle::{LifecycleManager, plan};
pub use poller::{PollReport, PollState, Poller};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use retry::{RetryError, RetryOutcome, RetryPolicy};
pub use scope::OperationScope;
pub use types::{ApplyOutcome, DeleteReport, Observation, ReconcileAction};

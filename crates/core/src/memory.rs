//! In-memory gateway that simulates the provisioning service.
//!
//! Reproduces the provider behaviours the reconciler has to cope with:
//! creates that fail with not-found while a referenced role is still
//! propagating, and deletes that are accepted but leave the constraint
//! describable for a while.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use ulid::Ulid;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{CreateConstraintRequest, RemoteGateway, UpdateConstraintRequest};
use crate::types::{ConstraintId, ConstraintState, ConstraintStatus};

/// Behaviour knobs for [`InMemoryGateway`].
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of create calls that fail with not-found before creates succeed.
    pub propagation_lag: u32,
    /// Number of describes that still see a constraint after its delete was
    /// accepted.
    pub deletion_lag: u32,
    /// Owner reported for every constraint.
    pub owner: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            propagation_lag: 0,
            deletion_lag: 0,
            owner: "123456789012".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Set the number of create calls rejected while the role propagates.
    #[must_use]
    pub const fn with_propagation_lag(mut self, calls: u32) -> Self {
        self.propagation_lag = calls;
        self
    }

    /// Set the number of describes that still see a deleted constraint.
    #[must_use]
    pub const fn with_deletion_lag(mut self, describes: u32) -> Self {
        self.deletion_lag = describes;
        self
    }
}

/// Number of calls made against a gateway, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: u32,
    pub describe: u32,
    pub update: u32,
    pub delete: u32,
}

#[derive(Debug, Default)]
struct Counters {
    create: AtomicU32,
    describe: AtomicU32,
    update: AtomicU32,
    delete: AtomicU32,
}

impl Counters {
    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CallCounts {
        CallCounts {
            create: self.create.load(Ordering::Relaxed),
            describe: self.describe.load(Ordering::Relaxed),
            update: self.update.load(Ordering::Relaxed),
            delete: self.delete.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredConstraint {
    state: ConstraintState,
    /// Describes left before a deleted constraint disappears.
    deleting: Option<u32>,
}

/// Simulated provisioning service holding constraints in memory.
#[derive(Debug)]
pub struct InMemoryGateway {
    constraints: RwLock<HashMap<ConstraintId, StoredConstraint>>,
    pending_propagation: AtomicU32,
    config: SimulationConfig,
    calls: Counters,
}

impl InMemoryGateway {
    /// Create a gateway with the given behaviour.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            constraints: RwLock::new(HashMap::new()),
            pending_propagation: AtomicU32::new(config.propagation_lag),
            config,
            calls: Counters::default(),
        }
    }

    /// Create a gateway wrapped in an Arc.
    pub fn new_arc(config: SimulationConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Calls made so far.
    pub fn calls(&self) -> CallCounts {
        self.calls.snapshot()
    }

    /// Number of constraints still stored, including ones being deleted.
    pub async fn len(&self) -> usize {
        self.constraints.read().await.len()
    }

    /// Whether no constraint is stored.
    pub async fn is_empty(&self) -> bool {
        self.constraints.read().await.is_empty()
    }

    /// Remove a constraint out of band, as if someone deleted it elsewhere.
    pub async fn remove(&self, id: &ConstraintId) -> bool {
        self.constraints.write().await.remove(id).is_some()
    }

    fn propagation_pending(&self) -> bool {
        self.pending_propagation
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok()
    }

    fn not_found(id: &ConstraintId) -> GatewayError {
        GatewayError::not_found(format!("Constraint {id} not found."))
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn create(&self, request: &CreateConstraintRequest) -> GatewayResult<ConstraintId> {
        Counters::bump(&self.calls.create);

        if request.portfolio_id.is_empty() || request.product_id.is_empty() {
            return Err(GatewayError::invalid_parameters(
                "PortfolioId and ProductId are required",
            ));
        }
        if self.propagation_pending() {
            debug!(portfolio_id = %request.portfolio_id, "Simulating role propagation lag");
            return Err(GatewayError::not_found("Role not found"));
        }

        let mut constraints = self.constraints.write().await;
        let duplicate = constraints.values().any(|stored| {
            stored.deleting.is_none()
                && stored.state.portfolio_id == request.portfolio_id
                && stored.state.product_id == request.product_id
                && stored.state.constraint_type == request.constraint_type
        });
        if duplicate {
            return Err(GatewayError::other(format!(
                "DuplicateResourceException: {} constraint already exists",
                request.constraint_type
            )));
        }

        let id = ConstraintId::new(format!("cons-{}", Ulid::new().to_string().to_lowercase()));
        let state = ConstraintState {
            id: id.clone(),
            owner: Some(self.config.owner.clone()),
            status: ConstraintStatus::Available,
            description: request.description.clone(),
            portfolio_id: request.portfolio_id.clone(),
            product_id: request.product_id.clone(),
            constraint_type: request.constraint_type,
            parameters: request.parameters.clone(),
        };
        constraints.insert(
            id.clone(),
            StoredConstraint {
                state,
                deleting: None,
            },
        );
        Ok(id)
    }

    async fn describe(&self, id: &ConstraintId) -> GatewayResult<ConstraintState> {
        Counters::bump(&self.calls.describe);

        let mut constraints = self.constraints.write().await;
        let stored = constraints.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        let deleting = stored.deleting;
        match deleting {
            Some(0) => {
                constraints.remove(id);
                Err(Self::not_found(id))
            }
            Some(left) => {
                stored.deleting = Some(left.saturating_sub(1));
                Ok(stored.state.clone())
            }
            None => Ok(stored.state.clone()),
        }
    }

    async fn update(&self, request: &UpdateConstraintRequest) -> GatewayResult<()> {
        Counters::bump(&self.calls.update);

        let mut constraints = self.constraints.write().await;
        let stored = constraints
            .get_mut(&request.id)
            .ok_or_else(|| Self::not_found(&request.id))?;
        if stored.deleting.is_some() {
            return Err(GatewayError::invalid_parameters(format!(
                "Constraint {} is being deleted",
                request.id
            )));
        }
        if let Some(description) = &request.description {
            stored.state.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(parameters) = &request.parameters {
            stored.state.parameters = parameters.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &ConstraintId) -> GatewayResult<()> {
        Counters::bump(&self.calls.delete);

        let mut constraints = self.constraints.write().await;
        let stored = constraints.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        if stored.deleting.is_none() {
            stored.deleting = Some(self.config.deletion_lag);
        }
        Ok(())
    }
}

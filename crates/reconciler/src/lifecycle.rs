//! Named constraint lifecycle.
//!
//! [`LifecycleManager`] tracks constraints by a caller-chosen name and turns
//! a desired spec into the right reconciler call: create when nothing is
//! tracked, update when only mutable fields differ, and destroy-then-create
//! when a write-once field differs.

use std::collections::HashMap;
use std::sync::Arc;

use constraint_core::{
    ChangeSet, ConstraintSpec, ConstraintState, ConstraintType, LaunchParameters,
};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Operation, Result};
use crate::reconciler::Reconciler;
use crate::types::{ApplyOutcome, DeleteReport, Observation, ReconcileAction};

/// Decide how to move `observed` to `desired`.
pub fn plan(desired: &ConstraintSpec, observed: Option<&ConstraintState>) -> ReconcileAction {
    let Some(observed) = observed else {
        return ReconcileAction::Create;
    };

    let changes = ChangeSet::between(observed, desired);
    let fields = changes.immutable_fields();
    if !fields.is_empty() {
        ReconcileAction::Replace { fields }
    } else if changes.is_empty() {
        ReconcileAction::Noop
    } else {
        ReconcileAction::Update { changes }
    }
}

/// Tracks named constraints and applies desired specs to them.
pub struct LifecycleManager {
    reconciler: Arc<Reconciler>,
    resources: HashMap<String, ConstraintState>,
}

impl LifecycleManager {
    /// Create a manager with nothing tracked.
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            resources: HashMap::new(),
        }
    }

    /// Last known state of a tracked constraint.
    pub fn get(&self, name: &str) -> Option<&ConstraintState> {
        self.resources.get(name)
    }

    /// Names of tracked constraints, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).sorted().collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Validate `spec` and converge the constraint tracked as `name` to it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the spec fails local validation; no
    ///   remote call is made.
    /// - Any error of the reconciler call the plan required. When the error
    ///   is [`Error::CreatedButUnreadable`], the new id is still tracked.
    pub async fn apply(
        &mut self,
        name: &str,
        spec: &ConstraintSpec,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome> {
        let operation = if self.resources.contains_key(name) {
            Operation::Update
        } else {
            Operation::Create
        };
        validate(spec).map_err(|e| Error::invalid_request(operation, spec.target(), e.to_string()))?;

        let observed = self.refresh(name, cancel).await?;
        let action = plan(spec, observed.as_ref());
        debug!(name, action = action.name(), "Planned constraint change");

        let state = match (&action, observed) {
            (ReconcileAction::Noop, Some(state)) => state,
            (ReconcileAction::Update { changes }, Some(current)) => {
                match self.reconciler.update(&current.id, changes, cancel).await? {
                    Observation::Present(state) => {
                        self.resources.insert(name.to_string(), state.clone());
                        state
                    }
                    Observation::Gone => {
                        self.resources.remove(name);
                        return Err(Error::NotFound { id: current.id });
                    }
                }
            }
            (ReconcileAction::Replace { fields }, Some(current)) => {
                info!(
                    name,
                    constraint_id = %current.id,
                    fields = %fields.iter().join(", "),
                    "Write-once field changed, replacing constraint"
                );
                self.reconciler.delete(&current.id, cancel).await?;
                self.resources.remove(name);
                self.create_tracked(name, spec, cancel).await?
            }
            _ => self.create_tracked(name, spec, cancel).await?,
        };

        Ok(ApplyOutcome { action, state })
    }

    /// Re-read a tracked constraint.
    ///
    /// Returns `None` when nothing is tracked under `name`, or when the
    /// constraint is gone remotely, in which case it is no longer tracked.
    ///
    /// # Errors
    ///
    /// Returns the reconciler's read error.
    pub async fn refresh(
        &mut self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ConstraintState>> {
        let Some(id) = self.resources.get(name).map(|state| state.id.clone()) else {
            return Ok(None);
        };

        match self.reconciler.read(&id, cancel).await? {
            Observation::Present(state) => {
                self.resources.insert(name.to_string(), state.clone());
                Ok(Some(state))
            }
            Observation::Gone => {
                warn!(name, constraint_id = %id, "Tracked constraint disappeared");
                self.resources.remove(name);
                Ok(None)
            }
        }
    }

    /// Delete a tracked constraint and stop tracking it.
    ///
    /// Returns `None` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns the reconciler's read or delete error; the constraint stays
    /// tracked in that case.
    pub async fn destroy(
        &mut self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<DeleteReport>> {
        let Some(current) = self.refresh(name, cancel).await? else {
            return Ok(None);
        };

        let report = self.reconciler.delete(&current.id, cancel).await?;
        self.resources.remove(name);
        Ok(Some(report))
    }

    async fn create_tracked(
        &mut self,
        name: &str,
        spec: &ConstraintSpec,
        cancel: &CancellationToken,
    ) -> Result<ConstraintState> {
        match self.reconciler.create(spec, cancel).await {
            Ok(state) => {
                self.resources.insert(name.to_string(), state.clone());
                Ok(state)
            }
            Err(Error::CreatedButUnreadable { id, source }) => {
                self.resources
                    .insert(name.to_string(), ConstraintState::provisional(id.clone(), spec));
                Err(Error::CreatedButUnreadable { id, source })
            }
            Err(error) => Err(error),
        }
    }
}

fn validate(spec: &ConstraintSpec) -> constraint_core::Result<()> {
    spec.validate()?;
    if spec.constraint_type == ConstraintType::Launch {
        LaunchParameters::decode(&spec.parameters)?;
    }
    Ok(())
}

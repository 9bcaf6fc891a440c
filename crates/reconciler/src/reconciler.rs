//! Reconciler implementation.
//!
//! One [`Reconciler`] drives create, read, update and delete of a single
//! constraint against an injected [`RemoteGateway`], absorbing the
//! provider's eventual consistency: role propagation lag on create and
//! delayed disappearance on delete.

use std::sync::Arc;

use constraint_core::{
    ChangeSet, ConstraintId, ConstraintSpec, ConstraintState, CreateConstraintRequest,
    GatewayError, GatewayErrorKind, RemoteGateway, UpdateConstraintRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{Budget, Error, Operation, Result, describe_id};
use crate::retry::RetryError;
use crate::scope::OperationScope;
use crate::types::{DeleteReport, Observation};

/// Constraint reconciler.
pub struct Reconciler {
    /// Client for the provisioning service.
    gateway: Arc<dyn RemoteGateway>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: ReconcilerConfig) -> Self {
        Self { gateway, config }
    }

    /// Start building a reconciler.
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    /// Create the constraint and return its described state.
    ///
    /// The create call is retried while the provider reports a referenced
    /// resource as not found; any other failure aborts immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if every create attempt hit not-found.
    /// - [`Error::InvalidRequest`] or [`Error::TransportOther`] for a
    ///   non-transient create failure.
    /// - [`Error::CreatedButUnreadable`] if the constraint was created but
    ///   the follow-up describe failed; the error carries the new id.
    /// - [`Error::Cancelled`] if `cancel` fires during a retry wait.
    pub async fn create(
        &self,
        spec: &ConstraintSpec,
        cancel: &CancellationToken,
    ) -> Result<ConstraintState> {
        let target = spec.target();
        let scope = OperationScope::new(
            Operation::Create,
            target.clone(),
            cancel,
            self.config.timeouts.create(),
        );
        let policy = self.config.create_retry.policy();
        let request = CreateConstraintRequest::from(spec);

        info!(constraint = %target, "Creating constraint");

        let gateway = &self.gateway;
        let request = &request;
        let object = &target;
        let outcome = policy
            .run(&scope, Error::is_dependency_not_ready, move |attempt| async move {
                debug!(constraint = %object, attempt, "Issuing create");
                gateway
                    .create(request)
                    .await
                    .map_err(|e| Error::from_create_failure(object.clone(), e))
            })
            .await;

        let id = match outcome {
            Ok(outcome) => outcome.value,
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(constraint = %target, attempts, error = %last, "Create retry budget exhausted");
                return Err(Error::Timeout {
                    operation: Operation::Create,
                    object: target,
                    budget: Budget::Attempts {
                        attempts,
                        interval: policy.interval(),
                    },
                });
            }
            Err(RetryError::Fatal { error, .. } | RetryError::Interrupted(error)) => {
                return Err(error);
            }
        };

        info!(constraint_id = %id, constraint = %target, "Constraint created");

        match self.gateway.describe(&id).await {
            Ok(state) => Ok(state),
            Err(source) => {
                warn!(constraint_id = %id, error = %source, "Created constraint could not be read back");
                let source = Error::from_gateway(Operation::Read, &id, source);
                Err(Error::CreatedButUnreadable {
                    id,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Describe the constraint.
    ///
    /// Not-found is a normal outcome: the constraint was removed out of band
    /// and [`Observation::Gone`] tells the caller to drop its local state.
    ///
    /// # Errors
    ///
    /// Returns the classified describe failure for anything but not-found,
    /// or [`Error::Cancelled`] if `cancel` has already fired.
    pub async fn read(&self, id: &ConstraintId, cancel: &CancellationToken) -> Result<Observation> {
        OperationScope::unbounded(Operation::Read, describe_id(id), cancel).check()?;

        match self.gateway.describe(id).await {
            Ok(state) => {
                debug!(constraint_id = %id, status = %state.status, "Constraint described");
                Ok(Observation::Present(state))
            }
            Err(error) if error.is_not_found() => {
                warn!(constraint_id = %id, "Constraint not found, removing from state");
                Ok(Observation::Gone)
            }
            Err(error) => Err(Error::from_gateway(Operation::Read, id, error)),
        }
    }

    /// Apply the mutable fields of `changes`, then read the constraint back.
    ///
    /// A change set with nothing to send skips the remote update.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `changes` touches a write-once field;
    ///   no remote call is made.
    /// - The classified update or describe failure otherwise.
    pub async fn update(
        &self,
        id: &ConstraintId,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> Result<Observation> {
        let scope = OperationScope::new(
            Operation::Update,
            describe_id(id),
            cancel,
            self.config.timeouts.update(),
        );
        let request = UpdateConstraintRequest::from_change_set(id.clone(), changes)
            .map_err(|e| Error::invalid_request(Operation::Update, describe_id(id), e.to_string()))?;

        if request.is_empty() {
            debug!(constraint_id = %id, "No mutable field changed, skipping update");
        } else {
            scope.check()?;
            info!(
                constraint_id = %id,
                description = request.description.is_some(),
                parameters = request.parameters.is_some(),
                "Updating constraint"
            );
            self.gateway
                .update(&request)
                .await
                .map_err(|e| Error::from_gateway(Operation::Update, id, e))?;
        }

        self.read(id, cancel).await
    }

    /// Delete the constraint and wait until the provider no longer
    /// describes it.
    ///
    /// The delete call is retried while the provider answers not-found or
    /// invalid-parameters, which it does for a constraint still settling
    /// from a previous change.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the delete retry budget or the poll deadline
    ///   runs out.
    /// - The classified failure for any other delete or describe error.
    /// - [`Error::Cancelled`] if `cancel` fires during a wait.
    pub async fn delete(
        &self,
        id: &ConstraintId,
        cancel: &CancellationToken,
    ) -> Result<DeleteReport> {
        let object = describe_id(id);
        let scope = OperationScope::new(
            Operation::Delete,
            object.clone(),
            cancel,
            self.config.timeouts.delete(),
        );
        let policy = self.config.delete_retry.policy();

        info!(constraint_id = %id, "Deleting constraint");

        let gateway = &self.gateway;
        let outcome = policy
            .run(&scope, is_delete_transient, move |attempt| async move {
                debug!(constraint_id = %id, attempt, "Issuing delete");
                gateway.delete(id).await
            })
            .await;

        let delete_attempts = match outcome {
            Ok(outcome) => outcome.attempts,
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(constraint_id = %id, attempts, error = %last, "Delete retry budget exhausted");
                return Err(Error::Timeout {
                    operation: Operation::Delete,
                    object,
                    budget: Budget::Attempts {
                        attempts,
                        interval: policy.interval(),
                    },
                });
            }
            Err(RetryError::Fatal { error, .. }) => {
                return Err(Error::from_gateway(Operation::Delete, id, error));
            }
            Err(RetryError::Interrupted(error)) => return Err(error),
        };

        let poll = self
            .config
            .delete_poll
            .poller()
            .await_absence(self.gateway.as_ref(), id, &scope)
            .await?;

        let report = DeleteReport {
            delete_attempts,
            polls: poll.polls,
            elapsed: scope.elapsed(),
        };
        info!(
            constraint_id = %id,
            delete_attempts,
            polls = report.polls,
            elapsed_ms = report.elapsed.as_millis(),
            "Constraint deleted"
        );
        Ok(report)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

fn is_delete_transient(error: &GatewayError) -> bool {
    matches!(
        error.kind,
        GatewayErrorKind::NotFound | GatewayErrorKind::InvalidParameters
    )
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    gateway: Option<Arc<dyn RemoteGateway>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            gateway: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the remote gateway.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn RemoteGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no gateway was set or the
    /// configuration fails validation.
    pub fn build(self) -> Result<Reconciler> {
        let gateway = self
            .gateway
            .ok_or_else(|| Error::invalid_config("Remote gateway is required"))?;
        self.config.validate()?;
        Ok(Reconciler::new(gateway, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use constraint_core::{
        ConstraintParameters, ConstraintStatus, ConstraintType, InMemoryGateway, LaunchParameters,
        SimulationConfig,
    };
    use tokio::time::Instant;

    use super::*;

    fn launch_spec() -> ConstraintSpec {
        let parameters = LaunchParameters::RoleArn("arn:aws:iam::123456789012:role/launch".into())
            .encode()
            .unwrap_or_else(|_| ConstraintParameters::new("{}"));
        ConstraintSpec::new("port-1", "prod-1", ConstraintType::Launch, parameters)
            .with_description("launch role")
    }

    fn setup_reconciler(simulation: SimulationConfig) -> (Reconciler, Arc<InMemoryGateway>) {
        let gateway = InMemoryGateway::new_arc(simulation);
        let reconciler = Reconciler::new(gateway.clone(), ReconcilerConfig::default());
        (reconciler, gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_rides_out_propagation_lag() {
        let (reconciler, gateway) =
            setup_reconciler(SimulationConfig::default().with_propagation_lag(3));
        let token = CancellationToken::new();
        let start = Instant::now();

        let state = reconciler.create(&launch_spec(), &token).await;

        assert_eq!(state.as_ref().ok().map(|s| &s.status), Some(&ConstraintStatus::Available));
        assert_eq!(gateway.calls().create, 4);
        assert_eq!(gateway.calls().describe, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_reports_gone_after_out_of_band_removal() {
        let (reconciler, gateway) = setup_reconciler(SimulationConfig::default());
        let token = CancellationToken::new();
        let created = reconciler.create(&launch_spec(), &token).await.ok();
        let id = created.map(|s| s.id).unwrap_or_else(|| ConstraintId::new("missing"));

        assert!(gateway.remove(&id).await);
        let observation = reconciler.read(&id, &token).await;
        assert_eq!(observation.ok(), Some(Observation::Gone));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_update_skips_remote_call() {
        let (reconciler, gateway) = setup_reconciler(SimulationConfig::default());
        let token = CancellationToken::new();
        let created = reconciler.create(&launch_spec(), &token).await.ok();
        let id = created.map(|s| s.id).unwrap_or_else(|| ConstraintId::new("missing"));

        let observation = reconciler.update(&id, &ChangeSet::new(), &token).await;
        assert!(matches!(observation, Ok(Observation::Present(_))));
        assert_eq!(gateway.calls().update, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_changes_description() {
        let (reconciler, _) = setup_reconciler(SimulationConfig::default());
        let token = CancellationToken::new();
        let created = reconciler.create(&launch_spec(), &token).await.ok();
        let id = created.map(|s| s.id).unwrap_or_else(|| ConstraintId::new("missing"));

        let changes = ChangeSet::new().with_description("renamed");
        let observation = reconciler.update(&id, &changes, &token).await;
        let description = observation
            .ok()
            .and_then(Observation::into_state)
            .and_then(|s| s.description);
        assert_eq!(description.as_deref(), Some("renamed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_for_absence() {
        let (reconciler, gateway) =
            setup_reconciler(SimulationConfig::default().with_deletion_lag(2));
        let token = CancellationToken::new();
        let created = reconciler.create(&launch_spec(), &token).await.ok();
        let id = created.map(|s| s.id).unwrap_or_else(|| ConstraintId::new("missing"));

        let report = reconciler.delete(&id, &token).await;

        assert_eq!(
            report.ok(),
            Some(DeleteReport {
                delete_attempts: 1,
                polls: 3,
                elapsed: Duration::from_secs(40),
            })
        );
        assert!(gateway.is_empty().await);
    }

    #[test]
    fn test_builder_requires_gateway() {
        let result = ReconcilerBuilder::new().build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder() {
        let result = Reconciler::builder()
            .with_gateway(InMemoryGateway::new_arc(SimulationConfig::default()))
            .with_config(ReconcilerConfig::default().with_delete_poll(5, 60))
            .build();

        assert_eq!(
            result.ok().map(|r| r.config().delete_poll.interval_secs),
            Some(5)
        );
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = Reconciler::builder()
            .with_gateway(InMemoryGateway::new_arc(SimulationConfig::default()))
            .with_config(ReconcilerConfig::default().with_create_retry(0, 10))
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}

// Common test infrastructure for reconciler tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use constraint_core::{
    ConstraintId, ConstraintParameters, ConstraintSpec, ConstraintState, ConstraintStatus,
    ConstraintType, CreateConstraintRequest, GatewayError, GatewayResult, RemoteGateway,
    UpdateConstraintRequest,
};
use constraint_reconciler::{Reconciler, ReconcilerConfig};
use tokio::time::Instant;

pub const CONSTRAINT_ID: &str = "cons-scripted";

/// Which gateway method a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Create,
    Describe,
    Update,
    Delete,
}

/// Gateway that answers from per-method queues and records when each call
/// arrived, relative to its construction.
///
/// An exhausted queue answers: create with [`CONSTRAINT_ID`], describe with
/// not-found, update and delete with success.
pub struct ScriptedGateway {
    origin: Instant,
    creates: Mutex<VecDeque<GatewayResult<ConstraintId>>>,
    describes: Mutex<VecDeque<GatewayResult<ConstraintState>>>,
    updates: Mutex<VecDeque<GatewayResult<()>>>,
    deletes: Mutex<VecDeque<GatewayResult<()>>>,
    calls: Mutex<Vec<(CallKind, Duration)>>,
    update_requests: Mutex<Vec<UpdateConstraintRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            creates: Mutex::new(VecDeque::new()),
            describes: Mutex::new(VecDeque::new()),
            updates: Mutex::new(VecDeque::new()),
            deletes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            update_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_creates(self, results: impl IntoIterator<Item = GatewayResult<ConstraintId>>) -> Self {
        lock(&self.creates).extend(results);
        self
    }

    pub fn with_describes(
        self,
        results: impl IntoIterator<Item = GatewayResult<ConstraintState>>,
    ) -> Self {
        lock(&self.describes).extend(results);
        self
    }

    pub fn with_updates(self, results: impl IntoIterator<Item = GatewayResult<()>>) -> Self {
        lock(&self.updates).extend(results);
        self
    }

    pub fn with_deletes(self, results: impl IntoIterator<Item = GatewayResult<()>>) -> Self {
        lock(&self.deletes).extend(results);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Arrival offsets of every call of `kind`.
    pub fn call_times(&self, kind: CallKind) -> Vec<Duration> {
        lock(&self.calls)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.call_times(kind).len()
    }

    pub fn update_requests(&self) -> Vec<UpdateConstraintRequest> {
        lock(&self.update_requests).clone()
    }

    fn record(&self, kind: CallKind) {
        lock(&self.calls).push((kind, self.origin.elapsed()));
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn create(&self, _request: &CreateConstraintRequest) -> GatewayResult<ConstraintId> {
        self.record(CallKind::Create);
        lock(&self.creates)
            .pop_front()
            .unwrap_or_else(|| Ok(ConstraintId::new(CONSTRAINT_ID)))
    }

    async fn describe(&self, id: &ConstraintId) -> GatewayResult<ConstraintState> {
        self.record(CallKind::Describe);
        lock(&self.describes)
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::not_found(format!("Constraint {id} not found."))))
    }

    async fn update(&self, request: &UpdateConstraintRequest) -> GatewayResult<()> {
        self.record(CallKind::Update);
        lock(&self.update_requests).push(request.clone());
        lock(&self.updates).pop_front().unwrap_or(Ok(()))
    }

    async fn delete(&self, _id: &ConstraintId) -> GatewayResult<()> {
        self.record(CallKind::Delete);
        lock(&self.deletes).pop_front().unwrap_or(Ok(()))
    }
}

pub fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

pub fn launch_spec() -> ConstraintSpec {
    ConstraintSpec::new(
        "port-abc123",
        "prod-def456",
        ConstraintType::Launch,
        ConstraintParameters::new(r#"{"RoleArn":"arn:aws:iam::123456789012:role/launch"}"#),
    )
    .with_description("launch role")
}

pub fn described(status: &str) -> GatewayResult<ConstraintState> {
    let mut state = ConstraintState::provisional(ConstraintId::new(CONSTRAINT_ID), &launch_spec());
    state.status = ConstraintStatus::from(status);
    state.owner = Some("123456789012".to_string());
    Ok(state)
}

pub fn available() -> GatewayResult<ConstraintState> {
    described("AVAILABLE")
}

pub fn reconciler(gateway: Arc<ScriptedGateway>) -> Reconciler {
    Reconciler::new(gateway, ReconcilerConfig::default())
}

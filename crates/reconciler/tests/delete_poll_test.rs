//! Delete path: bounded delete retry, then polling until the constraint is
//! no longer describable.

mod common;

use std::time::Duration;

use common::{CallKind, ScriptedGateway, available, described, reconciler, secs};
use constraint_core::{ConstraintId, ConstraintStatus, GatewayError};
use constraint_reconciler::{Budget, DeleteReport, Error, Operation};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn id() -> ConstraintId {
    ConstraintId::new(common::CONSTRAINT_ID)
}

#[tokio::test(start_paused = true)]
async fn test_delete_polls_until_not_found() {
    let gateway = ScriptedGateway::new()
        .with_describes([available(), available(), described("CREATING")])
        .into_arc();
    let reconciler = reconciler(gateway.clone());

    let report = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert_eq!(
        report.ok(),
        Some(DeleteReport {
            delete_attempts: 1,
            polls: 4,
            elapsed: Duration::from_secs(60),
        })
    );
    assert_eq!(gateway.call_times(CallKind::Delete), secs(&[0]));
    assert_eq!(
        gateway.call_times(CallKind::Describe),
        secs(&[0, 20, 40, 60])
    );
}

#[tokio::test(start_paused = true)]
async fn test_immediate_not_found_completes_without_waiting() {
    let gateway = ScriptedGateway::new().into_arc();
    let reconciler = reconciler(gateway.clone());

    let report = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert_eq!(report.ok().map(|r| (r.polls, r.elapsed)), Some((1, Duration::ZERO)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_stops_polling_immediately() {
    let gateway = ScriptedGateway::new()
        .with_describes([available()])
        .with_describes((0..40).map(|_| described("FAILED")))
        .into_arc();
    let reconciler = reconciler(gateway.clone());
    let start = Instant::now();

    let result = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert_eq!(
        result.as_ref().err(),
        Some(&Error::DeletionFailed {
            id: id(),
            status: ConstraintStatus::Failed,
        })
    );
    assert_eq!(result.err().map(|e| e.is_retryable()), Some(false));
    assert_eq!(gateway.call_times(CallKind::Describe), secs(&[0, 20]));
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_delete_times_out_when_constraint_lingers() {
    let gateway = ScriptedGateway::new()
        .with_describes((0..40).map(|_| available()))
        .into_arc();
    let reconciler = reconciler(gateway.clone());
    let start = Instant::now();

    let result = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(Error::Timeout {
            operation: Operation::AwaitDeletion,
            budget: Budget::Deadline(limit),
            ..
        }) if limit == Duration::from_secs(300)
    ));
    // Polls at 0s, 20s, ... 300s.
    assert_eq!(gateway.count(CallKind::Describe), 16);
    assert_eq!(start.elapsed(), Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn test_describe_failure_during_poll_is_fatal() {
    let gateway = ScriptedGateway::new()
        .with_describes([
            available(),
            Err(GatewayError::other("AccessDeniedException")),
        ])
        .into_arc();
    let reconciler = reconciler(gateway.clone());

    let result = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(Error::TransportOther {
            operation: Operation::AwaitDeletion,
            ..
        })
    ));
    assert_eq!(gateway.call_times(CallKind::Describe), secs(&[0, 20]));
}

#[tokio::test(start_paused = true)]
async fn test_delete_retries_settling_constraint() {
    let gateway = ScriptedGateway::new()
        .with_deletes([
            Err(GatewayError::invalid_parameters(
                "Constraint is in use by a provisioning operation",
            )),
            Err(GatewayError::not_found("Constraint not found")),
            Ok(()),
        ])
        .into_arc();
    let reconciler = reconciler(gateway.clone());

    let report = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert_eq!(
        report.ok(),
        Some(DeleteReport {
            delete_attempts: 3,
            polls: 1,
            elapsed: Duration::from_secs(20),
        })
    );
    assert_eq!(gateway.call_times(CallKind::Delete), secs(&[0, 10, 20]));
}

#[tokio::test(start_paused = true)]
async fn test_delete_retry_exhaustion_is_timeout() {
    let gateway = ScriptedGateway::new()
        .with_deletes((0..10).map(|_| Err(GatewayError::not_found("Constraint not found"))))
        .into_arc();
    let reconciler = reconciler(gateway.clone());

    let result = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(Error::Timeout {
            operation: Operation::Delete,
            budget: Budget::Attempts { attempts: 6, .. },
            ..
        })
    ));
    assert_eq!(gateway.count(CallKind::Delete), 6);
    assert_eq!(gateway.count(CallKind::Describe), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delete_service_failure_is_not_retried() {
    let gateway = ScriptedGateway::new()
        .with_deletes([Err(GatewayError::other("AccessDeniedException"))])
        .into_arc();
    let reconciler = reconciler(gateway.clone());

    let result = reconciler.delete(&id(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(Error::TransportOther {
            operation: Operation::Delete,
            ..
        })
    ));
    assert_eq!(gateway.count(CallKind::Delete), 1);
    assert_eq!(gateway.count(CallKind::Describe), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_poll_wait() {
    let gateway = ScriptedGateway::new()
        .with_describes((0..20).map(|_| available()))
        .into_arc();
    let reconciler = reconciler(gateway.clone());
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let result = reconciler.delete(&id(), &token).await;

    assert!(matches!(
        result,
        Err(Error::Cancelled {
            operation: Operation::Delete,
            ..
        })
    ));
    assert_eq!(gateway.call_times(CallKind::Describe), secs(&[0, 20]));
}

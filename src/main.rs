//! # constraintctl
//!
//! Command-line driver for the constraint reconciler.
//!
//! `simulate` runs one constraint through the full lifecycle against the
//! in-memory provisioning service: validate, create (retrying across role
//! propagation lag), optional in-place update, then destroy and wait for the
//! deletion to settle. Ctrl+C cancels whatever wait is in progress.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![forbid(clippy::expect_used)]

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use constraint_core::{
    ConstraintParameters, ConstraintSpec, ConstraintType, InMemoryGateway, LaunchParameters,
    SimulationConfig,
};
use constraint_reconciler::{LifecycleManager, Reconciler, ReconcilerConfig};

use crate::cli::{Cli, Commands, SimulateArgs};

const RESOURCE_NAME: &str = "constraint";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
        Commands::ShowConfig { config } => {
            let config = load_config(config.as_deref())?;
            let rendered = config
                .to_toml_string()
                .context("Failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ReconcilerConfig> {
    match path {
        Some(path) => ReconcilerConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(ReconcilerConfig::default()),
    }
}

fn build_spec(args: &SimulateArgs) -> Result<ConstraintSpec> {
    let constraint_type: ConstraintType = args
        .constraint_type
        .parse()
        .context("Unsupported constraint type")?;

    let parameters = match constraint_type {
        ConstraintType::Launch if args.parameters.is_some() => {
            bail!("--parameters is not accepted for LAUNCH; use --local-role-name or --role-arn")
        }
        ConstraintType::Launch => LaunchParameters::from_fields(
            args.local_role_name.as_deref(),
            args.role_arn.as_deref(),
        )
        .and_then(|launch| launch.encode())
        .context("Invalid LAUNCH role reference")?,
        _ if args.local_role_name.is_some() || args.role_arn.is_some() => {
            bail!("--local-role-name and --role-arn only apply to LAUNCH constraints, not {constraint_type}")
        }
        _ => ConstraintParameters::new(args.parameters.clone().unwrap_or_else(|| "{}".to_string())),
    };

    let spec = ConstraintSpec::new(&args.portfolio, &args.product, constraint_type, parameters);
    Ok(match &args.description {
        Some(description) => spec.with_description(description),
        None => spec,
    })
}

async fn simulate(args: SimulateArgs) -> Result<()> {
    let start_time = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let spec = build_spec(&args)?;

    let gateway = InMemoryGateway::new_arc(
        SimulationConfig::default()
            .with_propagation_lag(args.propagation_lag)
            .with_deletion_lag(args.deletion_lag),
    );
    let reconciler = Reconciler::builder()
        .with_gateway(gateway.clone())
        .with_config(config)
        .build()
        .context("Failed to build reconciler")?;
    let mut manager = LifecycleManager::new(Arc::new(reconciler));

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(token.clone()));

    let outcome = manager
        .apply(RESOURCE_NAME, &spec, &token)
        .await
        .with_context(|| format!("Failed to create {}", spec.target()))?;
    info!(
        constraint_id = %outcome.state.id,
        status = %outcome.state.status,
        action = outcome.action.name(),
        "Constraint applied"
    );

    match manager
        .refresh(RESOURCE_NAME, &token)
        .await
        .context("Failed to read constraint")?
    {
        Some(state) => info!(constraint_id = %state.id, status = %state.status, "Constraint read back"),
        None => info!("Constraint no longer exists"),
    }

    if let Some(description) = &args.update_description {
        let desired = spec.clone().with_description(description);
        let outcome = manager
            .apply(RESOURCE_NAME, &desired, &token)
            .await
            .context("Failed to update constraint")?;
        info!(
            constraint_id = %outcome.state.id,
            action = outcome.action.name(),
            "Constraint updated"
        );
    }

    if args.keep {
        if let Some(state) = manager.get(RESOURCE_NAME) {
            info!(constraint_id = %state.id, owner = ?state.owner, "Keeping constraint");
        }
    } else if let Some(report) = manager
        .destroy(RESOURCE_NAME, &token)
        .await
        .context("Failed to destroy constraint")?
    {
        info!(
            delete_attempts = report.delete_attempts,
            polls = report.polls,
            elapsed_ms = report.elapsed.as_millis(),
            "Constraint destroyed"
        );
    }

    let calls = gateway.calls();
    info!(
        create = calls.create,
        describe = calls.describe,
        update = calls.update,
        delete = calls.delete,
        elapsed_ms = start_time.elapsed().as_millis(),
        "Simulation finished"
    );
    Ok(())
}

/// Cancel `token` on Ctrl+C.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling in-flight waits");
            token.cancel();
        }
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate_args(extra: &[&str]) -> Option<SimulateArgs> {
        let base = ["constraintctl", "simulate", "--portfolio", "port-1", "--product", "prod-1"];
        match Cli::try_parse_from(base.iter().chain(extra)).ok()?.command {
            Commands::Simulate(args) => Some(args),
            Commands::ShowConfig { .. } => None,
        }
    }

    #[test]
    fn test_launch_with_role_arn_builds_spec() {
        let spec = simulate_args(&["--role-arn", "arn:aws:iam::123456789012:role/launch"])
            .map(|args| build_spec(&args));
        assert!(matches!(spec, Some(Ok(ref s)) if s.constraint_type == ConstraintType::Launch));
    }

    #[test]
    fn test_launch_rejects_raw_parameters() {
        let spec = simulate_args(&["--parameters", r#"{"RoleArn":"arn:aws:iam::1:role/x"}"#])
            .map(|args| build_spec(&args));
        assert!(matches!(spec, Some(Err(_))));
    }

    #[test]
    fn test_role_flags_rejected_for_other_types() {
        let spec = simulate_args(&["--type", "NOTIFICATION", "--local-role-name", "launch"])
            .map(|args| build_spec(&args));
        assert!(matches!(spec, Some(Err(ref e)) if e.to_string().contains("only apply to LAUNCH")));
    }

    #[test]
    fn test_role_flags_conflict_with_parameters() {
        assert!(simulate_args(&["--role-arn", "arn:aws:iam::1:role/x", "--parameters", "{}"]).is_none());
    }
}

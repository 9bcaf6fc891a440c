//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// constraintctl - constraint reconciliation
#[derive(Parser, Debug)]
#[command(name = "constraintctl")]
#[command(version)]
#[command(about = "Reconcile service-catalog constraints against a provisioning service")]
#[command(
    long_about = "constraintctl drives a constraint through create, update and delete, retrying across role propagation lag and waiting for deletions to settle."
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a constraint lifecycle against the in-memory provisioning service
    Simulate(SimulateArgs),

    /// Print the effective reconciler configuration as TOML
    ShowConfig {
        /// Reconciler configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Reconciler configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Portfolio identifier
    #[arg(long)]
    pub portfolio: String,

    /// Product identifier
    #[arg(long)]
    pub product: String,

    /// Constraint type (LAUNCH, NOTIFICATION, RESOURCE_UPDATE, STACKSET, TEMPLATE)
    #[arg(long = "type", default_value = "LAUNCH")]
    pub constraint_type: String,

    /// Role name for a LAUNCH constraint
    #[arg(long, conflicts_with_all = ["role_arn", "parameters"])]
    pub local_role_name: Option<String>,

    /// Role ARN for a LAUNCH constraint
    #[arg(long, conflicts_with = "parameters")]
    pub role_arn: Option<String>,

    /// Raw parameters document for non-LAUNCH types
    #[arg(long)]
    pub parameters: Option<String>,

    /// Constraint description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Description to apply as an in-place update after creation
    #[arg(long)]
    pub update_description: Option<String>,

    /// Create calls the service rejects with not-found before accepting
    #[arg(long, default_value_t = 0)]
    pub propagation_lag: u32,

    /// Describes that still see the constraint after its delete
    #[arg(long, default_value_t = 0)]
    pub deletion_lag: u32,

    /// Leave the constraint in place instead of destroying it
    #[arg(long, default_value_t = false)]
    pub keep: bool,
}

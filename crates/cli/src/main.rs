//! # target-magentobi
//!
//! Command line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Singer stdin to Magento BI loading with checkpoints on stdout
//! - Graceful stop handling

mod cli;
mod commands;
mod usage;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_target, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_observability(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "target-magentobi starting"
    );

    let result = match &cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        None => run_target(&cli.run).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = format!("{e:#}"), "Command failed");
    }

    result
}

/// Initialize logging and metrics based on CLI options
fn init_observability(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let metrics_port = match (&cli.command, cli.run.metrics_port) {
        (None, port) if port != 0 => Some(port),
        _ => None,
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: default_log_level.to_string(),
        force_level: cli.quiet || cli.verbose > 0,
    })
}

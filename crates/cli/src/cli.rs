//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// target-magentobi - Singer target for the Magento Business Intelligence import API
#[derive(Parser, Debug)]
#[command(
    name = "target-magentobi",
    author,
    version,
    about = "Singer target for the Magento Business Intelligence import API",
    long_about = "Reads Singer SCHEMA, RECORD and STATE messages from stdin, loads the \n\
                  records into Magento BI in size, count and age bounded batches, and \n\
                  writes each state that is safe to resume from to stdout.",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logs except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (logs always go to stderr)
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TARGET_MAGENTOBI_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a configuration file without reading input
    Validate(ValidateArgs),
}

/// Arguments for loading records (the default command)
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (JSON or TOML)
    #[arg(
        short,
        long,
        env = "TARGET_MAGENTOBI_CONFIG",
        required_unless_present = "dry_run"
    )]
    pub config: Option<PathBuf>,

    /// Read and acknowledge input without sending anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TARGET_MAGENTOBI_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{TargetConfig, MAX_BATCH_SIZE_BYTES};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    client_id: u64,
    magentobi_url: String,
    batch_size_bytes: usize,
    batch_delay_millis: u64,
    request_timeout_secs: u64,
    disable_collection: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    client_id: config.client_id,
                    magentobi_url: config.magentobi_url.clone(),
                    batch_size_bytes: config.batch_size_bytes,
                    batch_delay_millis: config.batch_delay_millis,
                    request_timeout_secs: config.request_timeout_secs,
                    disable_collection: config.disable_collection,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &TargetConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.batch_size_bytes > MAX_BATCH_SIZE_BYTES {
        warnings.push(format!(
            "batch_size_bytes is above the {MAX_BATCH_SIZE_BYTES}-byte transfer limit; \
             batches are still cut at the limit"
        ));
    }

    if config.batch_delay_millis == 0 {
        warnings.push("batch_delay_millis is 0 - every record is sent on its own".to_string());
    }

    if !config.magentobi_url.starts_with("https://") {
        warnings.push("magentobi_url is not https - the api key is sent in clear text".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Client: {}", summary.client_id);
            println!("  Endpoint: {}", summary.magentobi_url);
            println!("  Batch size (bytes): {}", summary.batch_size_bytes);
            println!("  Batch delay (ms): {}", summary.batch_delay_millis);
            println!("  Request timeout (s): {}", summary.request_timeout_secs);
            println!("  Usage collection: {}", !summary.disable_collection);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

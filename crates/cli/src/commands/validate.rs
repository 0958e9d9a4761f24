//! `validate` command implementation.

use anyhow::{Context, Result};
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
    destination: String,
    fan_out: usize,
    batches: u64,
    timeout_ms: u64,
    endpoint_count: usize,
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

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(plan) => {
            let warnings = collect_warnings(&plan);

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
                    destination: plan.batch.destination.to_string(),
                    fan_out: plan.batch.fan_out,
                    batches: plan.batch.batches,
                    timeout_ms: plan.batch.timeout_ms,
                    endpoint_count: plan.gateway.endpoints.len(),
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
fn collect_warnings(plan: &contracts::RunPlan) -> Vec<String> {
    let mut warnings = Vec::new();

    // A deadline shorter than the worst-case latency guarantees timeouts
    if plan.batch.timeout_ms <= plan.gateway.latency_max_ms {
        warnings.push(format!(
            "timeout_ms ({}) does not exceed latency_max_ms ({}) - most batches will time out",
            plan.batch.timeout_ms, plan.gateway.latency_max_ms
        ));
    }

    if plan.gateway.drop_rate > 0.0 && plan.batch.timeout_ms > 10_000 {
        warnings.push(format!(
            "drop_rate {} with a {} ms deadline means long stalls on dropped replies",
            plan.gateway.drop_rate, plan.batch.timeout_ms
        ));
    }

    if plan.batch.concurrency > plan.batch.batches as usize && plan.batch.batches > 0 {
        warnings.push(format!(
            "concurrency ({}) exceeds batches ({}) - extra slots are unused",
            plan.batch.concurrency, plan.batch.batches
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Destination: {}", summary.destination);
            println!("  Fan-out: {}", summary.fan_out);
            println!("  Batches: {}", summary.batches);
            println!("  Timeout: {} ms", summary.timeout_ms);
            println!("  Endpoints: {}", summary.endpoint_count);
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

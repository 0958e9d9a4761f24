//! Configuration validation
//!
//! Rules:
//! - field ranges (rates, timeout, concurrency) via derive validation
//! - endpoint ids unique and non-empty
//! - batch destination refers to a registered endpoint
//! - latency_min_ms <= latency_max_ms
//! - fan_out > 0

use std::collections::HashSet;

use contracts::{ContractError, RunPlan};
use validator::Validate;

/// Validate a RunPlan.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(plan: &RunPlan) -> Result<(), ContractError> {
    validate_ranges(plan)?;
    validate_fan_out(plan)?;
    validate_endpoints(plan)?;
    validate_destination(plan)?;
    validate_latency_window(plan)?;
    Ok(())
}

/// Run the derive-based range checks and fold the first failure into
/// a ContractError.
fn validate_ranges(plan: &RunPlan) -> Result<(), ContractError> {
    plan.validate().map_err(|errors| {
        let rendered = errors.to_string();
        let field = rendered
            .split(':')
            .next()
            .unwrap_or("run_plan")
            .trim()
            .to_string();
        ContractError::config_validation(field, rendered)
    })
}

fn validate_fan_out(plan: &RunPlan) -> Result<(), ContractError> {
    if plan.batch.fan_out == 0 {
        return Err(ContractError::config_validation(
            "batch.fan_out",
            "fan_out must be > 0",
        ));
    }
    Ok(())
}

/// Endpoint ids must be non-empty and globally unique
fn validate_endpoints(plan: &RunPlan) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, endpoint) in plan.gateway.endpoints.iter().enumerate() {
        if endpoint.id.as_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("gateway.endpoints[{idx}].id"),
                "endpoint id cannot be empty",
            ));
        }
        if !seen.insert(&endpoint.id) {
            return Err(ContractError::config_validation(
                format!("gateway.endpoints[id={}]", endpoint.id),
                "duplicate endpoint id",
            ));
        }
    }
    Ok(())
}

/// The dispatch destination must be one of the registered endpoints
fn validate_destination(plan: &RunPlan) -> Result<(), ContractError> {
    let known: HashSet<_> = plan
        .gateway
        .endpoints
        .iter()
        .map(|e| e.id.as_str())
        .collect();

    if !known.contains(plan.batch.destination.as_str()) {
        return Err(ContractError::config_validation(
            "batch.destination",
            format!(
                "destination '{}' not found among gateway endpoints",
                plan.batch.destination
            ),
        ));
    }

    Ok(())
}

fn validate_latency_window(plan: &RunPlan) -> Result<(), ContractError> {
    let gw = &plan.gateway;
    if gw.latency_min_ms > gw.latency_max_ms {
        return Err(ContractError::config_validation(
            "gateway.latency_min_ms / gateway.latency_max_ms",
            format!(
                "latency_min_ms ({}) must be <= latency_max_ms ({})",
                gw.latency_min_ms, gw.latency_max_ms
            ),
        ));
    }
    Ok(())
}

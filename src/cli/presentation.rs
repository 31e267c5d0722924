//! Text and JSON renderings of command results.

use crate::change::ChangeSet;
use crate::context::FilteredSpecification;
use crate::error::ApiError;
use crate::orchestrator::{RegenerationDecision, RegenerationMode};
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::Specification(format!("Failed to render JSON: {}", e)))
}

pub fn format_change_set_text(changes: &ChangeSet) -> String {
    changes.to_string()
}

pub fn format_decision_text(decision: &RegenerationDecision) -> String {
    match &decision.mode {
        RegenerationMode::Full => "Full regeneration: every output file is affected".to_string(),
        RegenerationMode::UpToDate => "Up to date: no files affected".to_string(),
        RegenerationMode::Incremental { affected } if affected.is_empty() => {
            "Incremental: changes detected but no recorded file depends on them".to_string()
        }
        RegenerationMode::Incremental { affected } => {
            let mut out = format!("Incremental: {} file(s) affected", affected.len());
            for path in affected {
                let _ = write!(out, "\n  {}", path);
            }
            out
        }
    }
}

pub fn format_context_text(context: &FilteredSpecification) -> String {
    let mut out = format!("Context for {}", context.target_path);
    if context.degraded {
        out.push_str(" (degraded: no entity matched, all entities included)");
    }
    let _ = write!(
        out,
        "\n  entities: {}/{} [{}]",
        context.filtered_entity_count,
        context.original_entity_count,
        context.entities.join(", ")
    );
    let packages: Vec<&str> = context
        .specification
        .architecture
        .packages
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    let _ = write!(
        out,
        "\n  packages: {}/{} [{}]",
        context.filtered_package_count,
        context.original_package_count,
        packages.join(", ")
    );
    let _ = write!(
        out,
        "\n  api contracts: {}",
        context.specification.api_contracts.len()
    );
    let _ = write!(out, "\n  reduction: {:.1}%", context.reduction_percent);
    out
}

/// Summary without the projected specification body.
pub fn context_summary_json(context: &FilteredSpecification) -> serde_json::Value {
    json!({
        "target_path": context.target_path,
        "entities": context.entities,
        "packages": context.packages,
        "api_contracts": context
            .specification
            .api_contracts
            .iter()
            .map(|c| c.key())
            .collect::<Vec<_>>(),
        "original_entity_count": context.original_entity_count,
        "filtered_entity_count": context.filtered_entity_count,
        "original_package_count": context.original_package_count,
        "filtered_package_count": context.filtered_package_count,
        "reduction_percent": context.reduction_percent,
        "degraded": context.degraded,
    })
}

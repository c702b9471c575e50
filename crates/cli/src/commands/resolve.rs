use std::path::Path;

use labprice_core::{format_spec, resolve_with, MatchedRule, PricingSpec, ResolvedPrice};
use serde::Serialize;
use tracing::info;

use crate::commands::{load_config, parse_parameters, read_json, CommandResult, EXIT_FAILURE};

#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    command: &'static str,
    status: &'static str,
    amount: String,
    matched_rule: Option<&'a MatchedRule>,
    warnings: Vec<String>,
    explanation: String,
}

pub fn run(spec_path: &Path, parameter_pairs: &[String], json_output: bool) -> CommandResult {
    let config = match load_config("resolve") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let spec: PricingSpec = match read_json("resolve", spec_path) {
        Ok(spec) => spec,
        Err(failure) => return failure,
    };
    let parameters = match parse_parameters("resolve", parameter_pairs) {
        Ok(parameters) => parameters,
        Err(failure) => return failure,
    };

    let resolved = match resolve_with(&spec, &parameters, &config.pricing.resolver_options()) {
        Ok(resolved) => resolved,
        Err(error) => {
            return CommandResult::failure("resolve", "pricing", error.to_string(), EXIT_FAILURE);
        }
    };
    info!(
        event_name = "cli.resolve.completed",
        price_type = %spec.price_type,
        amount = %resolved.amount,
        flagged = resolved.is_flagged(),
        "pricing spec resolved"
    );

    if json_output {
        let report = ResolveReport {
            command: "resolve",
            status: if resolved.is_flagged() { "flagged" } else { "ok" },
            amount: resolved.amount.normalize().to_string(),
            matched_rule: resolved.matched_rule.as_ref(),
            warnings: resolved.warnings.iter().map(ToString::to_string).collect(),
            explanation: format_spec(&spec),
        };
        return CommandResult::report("resolve", 0, &report);
    }

    CommandResult::text(0, render_human(&resolved))
}

fn render_human(resolved: &ResolvedPrice) -> String {
    let mut lines = vec![format!("amount: {}", resolved.amount.normalize())];
    if let Some(matched) = &resolved.matched_rule {
        lines.push(format!(
            "matched rule #{}: {} -> {}",
            matched.index, matched.rule.condition, matched.rule.value
        ));
    }
    for warning in &resolved.warnings {
        lines.push(format!("warning: {warning}"));
    }
    lines.join("\n")
}

use std::path::Path;

use labprice_core::{
    validate_spec, ApplicationError, BillableUnit, BillingLine, DeterministicPricingEngine,
    DomainError, LineOutcome, OverrideBook, PriceOverride, PricingEngine, ReferrerId,
};
use serde::Serialize;
use tracing::info;

use crate::commands::{
    load_config, parse_parameters, read_json, CommandResult, EXIT_FAILURE, EXIT_INPUT,
};

pub struct PriceArgs<'a> {
    pub unit_path: &'a Path,
    pub overrides_path: Option<&'a Path>,
    pub referrer: Option<&'a str>,
    pub parameter_pairs: &'a [String],
    pub strict: bool,
    pub json_output: bool,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    command: &'static str,
    unit_id: String,
    display: String,
    members: Vec<MemberLine>,
}

#[derive(Debug, Serialize)]
struct MemberLine {
    unit_id: String,
    display: String,
}

pub fn run(args: PriceArgs<'_>) -> CommandResult {
    let config = match load_config("price") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let unit: BillableUnit = match read_json("price", args.unit_path) {
        Ok(unit) => unit,
        Err(failure) => return failure,
    };
    let overrides: Vec<PriceOverride> = match args.overrides_path {
        Some(path) => match read_json("price", path) {
            Ok(overrides) => overrides,
            Err(failure) => return failure,
        },
        None => Vec::new(),
    };
    let parameters = match parse_parameters("price", args.parameter_pairs) {
        Ok(parameters) => parameters,
        Err(failure) => return failure,
    };

    if args.strict {
        let validation = validate_spec(unit.pricing());
        if !validation.valid {
            let summary = validation
                .issues
                .iter()
                .map(|issue| issue.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            let error = ApplicationError::from(DomainError::InvalidPricingSpec {
                unit_id: unit.id().clone(),
                summary,
            })
            .into_interface(unit.id().to_string());
            return CommandResult::failure("price", error.error_class(), error.to_string(), EXIT_INPUT);
        }
    }

    let referrer = args.referrer.map(|id| ReferrerId(id.to_string()));
    let book = OverrideBook::new(overrides);
    let engine = DeterministicPricingEngine::new(config.pricing.resolver_options());
    let lines = vec![BillingLine { unit, parameters }];
    let outcomes = engine.price_lines(&lines, referrer.as_ref(), &book);

    let Some(outcome) = outcomes.into_iter().next() else {
        return CommandResult::failure("price", "internal", "no pricing outcome produced", EXIT_FAILURE);
    };

    if let LineOutcome::Failed { unit_id, error } = &outcome {
        let interface = ApplicationError::from(error.clone()).into_interface(unit_id.to_string());
        return CommandResult::failure(
            "price",
            interface.error_class(),
            outcome.display_amount(),
            EXIT_FAILURE,
        );
    }

    let members = match &outcome {
        LineOutcome::Priced(pricing) => pricing
            .members
            .iter()
            .map(|member| MemberLine {
                unit_id: member.unit_id.to_string(),
                display: member.display_amount(),
            })
            .collect(),
        LineOutcome::Failed { .. } => Vec::new(),
    };

    info!(
        event_name = "cli.price.completed",
        unit_id = %outcome.unit_id(),
        member_count = members.len(),
        "billing line priced"
    );

    let report = PriceReport {
        command: "price",
        unit_id: outcome.unit_id().to_string(),
        display: outcome.display_amount(),
        members,
    };

    if args.json_output {
        return CommandResult::report("price", 0, &report);
    }

    let mut rendered = vec![format!("{}: {}", report.unit_id, report.display)];
    rendered.extend(
        report.members.iter().map(|member| format!("  - {}: {}", member.unit_id, member.display)),
    );
    CommandResult::text(0, rendered.join("\n"))
}

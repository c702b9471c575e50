use std::path::Path;

use labprice_core::{validate_spec, PricingSpec};
use serde::Serialize;

use crate::commands::{read_json, CommandResult, EXIT_FAILURE};

#[derive(Debug, Serialize)]
struct CheckReport {
    command: &'static str,
    valid: bool,
    issues: Vec<labprice_core::SpecIssue>,
}

pub fn run(spec_path: &Path, json_output: bool) -> CommandResult {
    let spec: PricingSpec = match read_json("check", spec_path) {
        Ok(spec) => spec,
        Err(failure) => return failure,
    };

    let result = validate_spec(&spec);
    let exit_code = if result.valid { 0 } else { EXIT_FAILURE };

    if json_output {
        let report = CheckReport { command: "check", valid: result.valid, issues: result.issues };
        return CommandResult::report("check", exit_code, &report);
    }

    if result.valid {
        return CommandResult::text(exit_code, "check: pricing spec is valid");
    }

    let mut lines = vec![format!("check: {} issue(s) found", result.issues.len())];
    lines.extend(result.issues.iter().map(|issue| format!("- [{}] {}", issue.code, issue.message)));
    CommandResult::text(exit_code, lines.join("\n"))
}

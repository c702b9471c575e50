use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use labprice_cli::commands::{check, config, explain, price, resolve};
use serde_json::Value;
use tempfile::TempDir;

const AGE_BANDED_SPEC: &str = r#"{
    "price_type": "conditional",
    "conditions": [
        { "condition": "AGE < 18", "value": 12.5 },
        { "condition": "AGE >= 18", "value": "AGE / 2 + 10" }
    ]
}"#;

const ADULTS_ONLY_SPEC: &str = r#"{
    "price_type": "conditional",
    "conditions": [
        { "condition": "AGE >= 18", "value": 30 }
    ]
}"#;

const LIPID_PANEL: &str = r#"{
    "kind": "composite",
    "id": "lipid",
    "name": "Lipid panel",
    "pricing": { "price_type": "fixed", "fixed_price": 40 },
    "members": [
        {
            "unit": { "id": "hdl", "name": "HDL", "pricing": { "price_type": "fixed", "fixed_price": 15 } },
            "is_default": true
        },
        {
            "unit": { "id": "ldl", "name": "LDL", "pricing": { "price_type": "fixed", "fixed_price": 18 } },
            "active": false
        }
    ]
}"#;

const CLINIC_OVERRIDES: &str = r#"[
    {
        "referrer_id": "clinic-a",
        "unit_id": "lipid",
        "pricing": { "price_type": "fixed", "fixed_price": 35 }
    },
    {
        "referrer_id": "clinic-a",
        "unit_id": "hdl",
        "panel_id": "lipid",
        "pricing": { "price_type": "fixed", "fixed_price": 12 }
    }
]"#;

#[test]
fn resolve_reports_amount_and_matched_rule_as_json() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    with_env(&[], || {
        let result = resolve::run(&spec, &["AGE=42".to_string()], true);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "resolve");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["amount"], "31");
        assert_eq!(payload["matched_rule"]["index"], 1);
        assert_eq!(payload["warnings"].as_array().map(Vec::len), Some(0));
    });
}

#[test]
fn resolve_flags_missing_parameters_instead_of_failing() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    with_env(&[], || {
        let result = resolve::run(&spec, &[], true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "flagged");
        assert_eq!(payload["amount"], "12.5");
        let warnings = payload["warnings"].as_array().expect("warnings array");
        assert!(warnings.iter().any(|warning| warning.as_str().is_some_and(|w| w.contains("AGE"))));
    });
}

#[test]
fn resolve_human_output_lists_warnings() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "adults.json", ADULTS_ONLY_SPEC);

    with_env(&[], || {
        let result = resolve::run(&spec, &["AGE=9".to_string()], false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("amount: 0"));
        assert!(result.output.contains("warning: none of 1 conditions matched"));
    });
}

#[test]
fn resolve_rejects_unmatched_conditions_under_reject_policy() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "adults.json", ADULTS_ONLY_SPEC);

    with_env(&[("LABPRICE_PRICING_NO_MATCH_POLICY", "reject")], || {
        let result = resolve::run(&spec, &["AGE=9".to_string()], true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "pricing");
    });
}

#[test]
fn resolve_returns_input_failure_for_malformed_parameter() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    with_env(&[], || {
        for pair in ["AGE", "=4", "AGE=forty"] {
            let result = resolve::run(&spec, &[pair.to_string()], true);
            assert_eq!(result.exit_code, 3, "pair `{pair}` should be rejected");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "invalid_input");
            assert!(payload["message"].as_str().is_some_and(|m| m.starts_with("invalid input: ")));
        }
    });
}

#[test]
fn resolve_returns_input_failure_for_missing_spec_file() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.json");

    with_env(&[], || {
        let result = resolve::run(&missing, &[], true);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "resolve");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn resolve_returns_config_failure_for_invalid_env() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    with_env(&[("LABPRICE_LOGGING_LEVEL", "chatty")], || {
        let result = resolve::run(&spec, &["AGE=42".to_string()], true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn price_applies_referrer_and_panel_overrides() {
    let dir = TempDir::new().expect("temp dir");
    let unit = write_file(&dir, "lipid.json", LIPID_PANEL);
    let overrides = write_file(&dir, "overrides.json", CLINIC_OVERRIDES);

    with_env(&[], || {
        let result = price::run(price::PriceArgs {
            unit_path: &unit,
            overrides_path: Some(&overrides),
            referrer: Some("clinic-a"),
            parameter_pairs: &[],
            strict: false,
            json_output: true,
        });
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["unit_id"], "lipid");
        assert_eq!(payload["display"], "35");
        let members = payload["members"].as_array().expect("members array");
        assert_eq!(members.len(), 1, "inactive members are not priced");
        assert_eq!(members[0]["unit_id"], "hdl");
        assert_eq!(members[0]["display"], "12");
    });
}

#[test]
fn price_uses_base_pricing_for_other_referrers() {
    let dir = TempDir::new().expect("temp dir");
    let unit = write_file(&dir, "lipid.json", LIPID_PANEL);
    let overrides = write_file(&dir, "overrides.json", CLINIC_OVERRIDES);

    with_env(&[], || {
        let result = price::run(price::PriceArgs {
            unit_path: &unit,
            overrides_path: Some(&overrides),
            referrer: Some("clinic-b"),
            parameter_pairs: &[],
            strict: false,
            json_output: false,
        });
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "lipid: 40\n  - hdl: 15");
    });
}

#[test]
fn price_flags_member_priced_from_missing_parameter() {
    let dir = TempDir::new().expect("temp dir");
    let unit = write_file(
        &dir,
        "cbc.json",
        r#"{
            "kind": "composite",
            "id": "cbc",
            "name": "Complete blood count",
            "pricing": { "price_type": "fixed", "fixed_price": 40 },
            "members": [
                {
                    "unit": {
                        "id": "wbc",
                        "name": "White cell count",
                        "pricing": { "price_type": "formula", "formula": "samples * 4" }
                    }
                }
            ]
        }"#,
    );

    with_env(&[], || {
        let result = price::run(price::PriceArgs {
            unit_path: &unit,
            overrides_path: None,
            referrer: None,
            parameter_pairs: &[],
            strict: false,
            json_output: false,
        });
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "cbc: 40\n  - wbc: 0 (CHECK PARAMETERS)");
    });
}

#[test]
fn price_reports_failed_line_as_price_error() {
    let dir = TempDir::new().expect("temp dir");
    let unit = write_file(
        &dir,
        "ratio.json",
        r#"{
            "kind": "single",
            "id": "ratio",
            "name": "Ratio",
            "pricing": { "price_type": "formula", "formula": "100 / DILUTION" }
        }"#,
    );

    with_env(&[], || {
        let result = price::run(price::PriceArgs {
            unit_path: &unit,
            overrides_path: None,
            referrer: None,
            parameter_pairs: &["DILUTION=0".to_string()],
            strict: false,
            json_output: true,
        });
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        let message = payload["message"].as_str().expect("message");
        assert!(message.starts_with("PRICE ERROR ("), "got {message}");
    });
}

#[test]
fn strict_price_rejects_invalid_base_pricing() {
    let dir = TempDir::new().expect("temp dir");
    let unit = write_file(
        &dir,
        "broken.json",
        r#"{
            "kind": "single",
            "id": "broken",
            "name": "Broken",
            "pricing": { "price_type": "formula" }
        }"#,
    );

    with_env(&[], || {
        let result = price::run(price::PriceArgs {
            unit_path: &unit,
            overrides_path: None,
            referrer: None,
            parameter_pairs: &[],
            strict: true,
            json_output: true,
        });
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert!(payload["message"].as_str().is_some_and(|m| m.contains("broken")));
    });
}

#[test]
fn explain_prints_one_line_per_condition() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    let result = explain::run(&spec);
    assert_eq!(result.exit_code, 0);

    let lines: Vec<&str> = result.output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("AGE < 18"));
    assert!(lines[1].contains("AGE ≥ 18"));
}

#[test]
fn check_lists_issues_and_exits_nonzero() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "empty.json", r#"{ "price_type": "formula" }"#);

    let result = check::run(&spec, true);
    assert_eq!(result.exit_code, 1);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["valid"], false);
    let issues = payload["issues"].as_array().expect("issues array");
    assert!(issues.iter().any(|issue| issue["code"] == "MISSING_FORMULA"));
}

#[test]
fn check_accepts_valid_spec() {
    let dir = TempDir::new().expect("temp dir");
    let spec = write_file(&dir, "tsh.json", AGE_BANDED_SPEC);

    let result = check::run(&spec, false);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output, "check: pricing spec is valid");
}

#[test]
fn config_attributes_env_sources() {
    with_env(&[("LABPRICE_LOG_LEVEL", "debug")], || {
        let output = config::run();
        assert!(output.starts_with("effective config"));
        assert!(output.contains("- logging.level = debug (source: env (LABPRICE_LOG_LEVEL))"));
        assert!(output.contains("- pricing.no_match_policy = zero_with_warning (source: default)"));
        assert!(output.contains("- logging.format = compact (source: default)"));
    });
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LABPRICE_PRICING_NO_MATCH_POLICY",
        "LABPRICE_PRICING_UNKNOWN_PARAMETER_POLICY",
        "LABPRICE_LOGGING_LEVEL",
        "LABPRICE_LOGGING_FORMAT",
        "LABPRICE_LOG_LEVEL",
        "LABPRICE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

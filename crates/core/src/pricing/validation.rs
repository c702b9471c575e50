use serde::{Deserialize, Serialize};

use crate::domain::parameters::ParameterSet;
use crate::domain::pricing::{PriceType, PricingSpec, RuleValue};
use crate::pricing::expression::{self, ValueKind};
use crate::pricing::substitution::substitute_tokens;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIssue {
    pub code: String,
    pub message: String,
    pub rule_index: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<SpecIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self { valid: true, issues: Vec::new() }
    }
}

/// Authoring-time checks for a pricing spec.
///
/// Expressions are checked for grammar and type only; parameters are not
/// known yet, so nothing is evaluated.
pub fn validate_spec(spec: &PricingSpec) -> ValidationResult {
    let mut result = ValidationResult::default();

    match spec.price_type {
        PriceType::Fixed => {
            if spec.fixed_price.is_none() {
                result.issues.push(issue("MISSING_FIXED_PRICE", "Fixed pricing has no amount", None));
            }
        }
        PriceType::Formula => match spec.formula.as_deref() {
            None => result.issues.push(issue("MISSING_FORMULA", "Formula pricing has no formula", None)),
            Some(formula) => {
                if let Err(reason) = check_expression(formula, ValueKind::Number) {
                    result.issues.push(issue("INVALID_FORMULA", format!("Formula is invalid: {reason}"), None));
                }
            }
        },
        PriceType::Conditional => match spec.conditions.as_deref() {
            None => result.issues.push(issue(
                "MISSING_CONDITIONS",
                "Conditional pricing has no condition list",
                None,
            )),
            Some([]) => result.issues.push(issue(
                "EMPTY_CONDITIONS",
                "Conditional pricing has no rules, so every line would price at 0",
                None,
            )),
            Some(conditions) => {
                for (index, rule) in conditions.iter().enumerate() {
                    if let Err(reason) = check_expression(&rule.condition, ValueKind::Boolean) {
                        result.issues.push(issue(
                            "INVALID_CONDITION",
                            format!("Rule {index} condition is invalid: {reason}"),
                            Some(index),
                        ));
                    }
                    if let RuleValue::Expression(text) = &rule.value {
                        if let Err(reason) = check_expression(text, ValueKind::Number) {
                            result.issues.push(issue(
                                "INVALID_RULE_VALUE",
                                format!("Rule {index} value is invalid: {reason}"),
                                Some(index),
                            ));
                        }
                    }
                }
            }
        },
    }

    if !result.issues.is_empty() {
        result.valid = false;
    }

    result
}

fn check_expression(text: &str, expected: ValueKind) -> Result<(), String> {
    let placeholder = substitute_tokens(text, &ParameterSet::new());
    let expr = expression::parse(&placeholder.text).map_err(|error| error.to_string())?;
    let kind = expr.infer_kind().map_err(|error| error.to_string())?;
    if kind != expected {
        return Err(format!("expected a {expected} expression, found {kind}"));
    }
    Ok(())
}

fn issue(code: &str, message: impl Into<String>, rule_index: Option<usize>) -> SpecIssue {
    SpecIssue { code: code.to_string(), message: message.into(), rule_index }
}

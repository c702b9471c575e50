use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::parameters::ParameterSet;
use crate::domain::pricing::{ConditionRule, PriceType, PricingSpec, RuleValue};
use crate::pricing::expression::{self, ExpressionError};
use crate::pricing::substitution::substitute;

/// What the resolver does when no conditional rule matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    /// Price at zero and attach [`PricingWarning::NoConditionMatched`].
    #[default]
    ZeroWithWarning,
    Reject,
}

/// What the resolver does when an expression names a parameter the line
/// did not supply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownParameterPolicy {
    #[default]
    ZeroWithWarning,
    Reject,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    pub no_match: NoMatchPolicy,
    pub unknown_parameter: UnknownParameterPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePart {
    Condition,
    Value,
}

/// Position of a conditional rule and which of its expressions is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLocation {
    pub index: usize,
    pub part: RulePart,
}

impl fmt::Display for RuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = match self.part {
            RulePart::Condition => "condition",
            RulePart::Value => "value",
        };
        write!(f, "rule {} {part}", self.index)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("{price_type} pricing is missing `{field}`")]
    MissingField { price_type: PriceType, field: &'static str },
    #[error("unknown parameter `{name}`{}", location_suffix(.rule))]
    UnknownParameter { name: String, rule: Option<RuleLocation> },
    #[error("pricing expression failed{}: {source}", location_suffix(.rule))]
    Expression { rule: Option<RuleLocation>, source: ExpressionError },
    #[error("no condition matched among {rule_count} rules")]
    NoConditionMatched { rule_count: usize },
}

impl PricingError {
    pub fn rule(&self) -> Option<RuleLocation> {
        match self {
            Self::UnknownParameter { rule, .. } | Self::Expression { rule, .. } => *rule,
            Self::MissingField { .. } | Self::NoConditionMatched { .. } => None,
        }
    }
}

fn location_suffix(rule: &Option<RuleLocation>) -> String {
    rule.map(|location| format!(" in {location}")).unwrap_or_default()
}

/// Non-fatal signals a caller must surface alongside the amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    UnknownParameter { name: String, rule: Option<RuleLocation> },
    NoConditionMatched { rule_count: usize },
}

impl fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParameter { name, rule } => {
                write!(f, "parameter `{name}` has no value and was priced as 0{}", location_suffix(rule))
            }
            Self::NoConditionMatched { rule_count } => {
                write!(f, "none of {rule_count} conditions matched; amount defaulted to 0")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub index: usize,
    pub rule: ConditionRule,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub amount: Decimal,
    pub matched_rule: Option<MatchedRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PricingWarning>,
}

impl ResolvedPrice {
    pub fn is_flagged(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn no_condition_matched(&self) -> bool {
        self.warnings.iter().any(|warning| matches!(warning, PricingWarning::NoConditionMatched { .. }))
    }

    /// Report cell for the amount. Unmatched conditions and missing
    /// parameters are spelled out so they cannot pass for a real zero.
    pub fn display_amount(&self) -> String {
        let amount = self.amount.normalize();
        if self.no_condition_matched() {
            format!("{amount} (NO RULE MATCHED)")
        } else if self.is_flagged() {
            format!("{amount} (CHECK PARAMETERS)")
        } else {
            amount.to_string()
        }
    }
}

pub fn resolve(spec: &PricingSpec, parameters: &ParameterSet) -> Result<ResolvedPrice, PricingError> {
    resolve_with(spec, parameters, &ResolverOptions::default())
}

pub fn resolve_with(
    spec: &PricingSpec,
    parameters: &ParameterSet,
    options: &ResolverOptions,
) -> Result<ResolvedPrice, PricingError> {
    let mut resolution = Resolution { parameters, options, warnings: Vec::new() };

    let (amount, matched_rule) = match spec.price_type {
        PriceType::Fixed => {
            let amount = spec.fixed_price.ok_or(PricingError::MissingField {
                price_type: PriceType::Fixed,
                field: "fixed_price",
            })?;
            (amount, None)
        }
        PriceType::Formula => {
            let formula = spec.formula.as_deref().ok_or(PricingError::MissingField {
                price_type: PriceType::Formula,
                field: "formula",
            })?;
            (resolution.numeric(formula, None)?, None)
        }
        PriceType::Conditional => {
            let conditions = spec.conditions.as_deref().ok_or(PricingError::MissingField {
                price_type: PriceType::Conditional,
                field: "conditions",
            })?;
            resolution.first_match(conditions)?
        }
    };

    Ok(ResolvedPrice { amount, matched_rule, warnings: resolution.warnings })
}

struct Resolution<'a> {
    parameters: &'a ParameterSet,
    options: &'a ResolverOptions,
    warnings: Vec<PricingWarning>,
}

impl Resolution<'_> {
    fn first_match(
        &mut self,
        conditions: &[ConditionRule],
    ) -> Result<(Decimal, Option<MatchedRule>), PricingError> {
        for (index, rule) in conditions.iter().enumerate() {
            let location = RuleLocation { index, part: RulePart::Condition };
            if !self.boolean(&rule.condition, location)? {
                continue;
            }

            let amount = match &rule.value {
                RuleValue::Number(amount) => *amount,
                RuleValue::Expression(text) => {
                    self.numeric(text, Some(RuleLocation { index, part: RulePart::Value }))?
                }
            };
            debug!(event_name = "pricing.conditional.matched", rule_index = index, amount = %amount);
            return Ok((amount, Some(MatchedRule { index, rule: rule.clone() })));
        }

        let rule_count = conditions.len();
        warn!(event_name = "pricing.conditional.no_match", rule_count, "no pricing condition matched");
        match self.options.no_match {
            NoMatchPolicy::ZeroWithWarning => {
                self.warnings.push(PricingWarning::NoConditionMatched { rule_count });
                Ok((Decimal::ZERO, None))
            }
            NoMatchPolicy::Reject => Err(PricingError::NoConditionMatched { rule_count }),
        }
    }

    fn numeric(&mut self, text: &str, rule: Option<RuleLocation>) -> Result<Decimal, PricingError> {
        let substituted = self.substitute(text, rule)?;
        expression::evaluate_numeric(&substituted).map_err(|source| PricingError::Expression { rule, source })
    }

    fn boolean(&mut self, text: &str, location: RuleLocation) -> Result<bool, PricingError> {
        let substituted = self.substitute(text, Some(location))?;
        expression::evaluate_boolean(&substituted)
            .map_err(|source| PricingError::Expression { rule: Some(location), source })
    }

    fn substitute(&mut self, text: &str, rule: Option<RuleLocation>) -> Result<String, PricingError> {
        let substitution = substitute(text, self.parameters);
        if let Some(name) = substitution.unknown.first() {
            if self.options.unknown_parameter == UnknownParameterPolicy::Reject {
                return Err(PricingError::UnknownParameter { name: name.clone(), rule });
            }
        }
        self.warnings.extend(
            substitution.unknown.into_iter().map(|name| PricingWarning::UnknownParameter { name, rule }),
        );
        Ok(substitution.text)
    }
}

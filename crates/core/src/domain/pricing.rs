use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Fixed,
    Formula,
    Conditional,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fixed => "fixed",
            Self::Formula => "formula",
            Self::Conditional => "conditional",
        };
        f.write_str(label)
    }
}

/// Price expression of a conditional rule: a literal amount or a formula
/// over the line's parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(Decimal),
    Expression(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(amount) => write!(f, "{}", amount.normalize()),
            Self::Expression(text) => f.write_str(text.trim()),
        }
    }
}

impl From<Decimal> for RuleValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        Self::Expression(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub condition: String,
    pub value: RuleValue,
}

impl ConditionRule {
    pub fn new(condition: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        Self { condition: condition.into(), value: value.into() }
    }
}

/// Stored pricing configuration of a billable unit or referrer override.
///
/// `price_type` selects which of the optional fields is meaningful; the
/// others are carried but ignored. `conditions` keeps author order because
/// the first matching rule wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSpec {
    pub price_type: PriceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionRule>>,
}

impl PricingSpec {
    pub fn fixed(amount: Decimal) -> Self {
        Self { price_type: PriceType::Fixed, fixed_price: Some(amount), formula: None, conditions: None }
    }

    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            price_type: PriceType::Formula,
            fixed_price: None,
            formula: Some(formula.into()),
            conditions: None,
        }
    }

    pub fn conditional(conditions: Vec<ConditionRule>) -> Self {
        Self {
            price_type: PriceType::Conditional,
            fixed_price: None,
            formula: None,
            conditions: Some(conditions),
        }
    }
}

use crate::domain::pricing::{PriceType, PricingSpec};

const NOT_CONFIGURED: &str = "not configured";

/// Operator spellings rewritten for readers, applied in order.
const READABLE_OPERATORS: [(&str, &str); 5] =
    [("==", " = "), ("<=", " ≤ "), (">=", " ≥ "), ("&&", " and "), ("||", " or ")];

/// Human-readable rendering of a pricing spec for reports and exports.
///
/// Display only: billing always goes through the resolver.
pub fn format(spec: &PricingSpec) -> String {
    match spec.price_type {
        PriceType::Fixed => spec
            .fixed_price
            .map(|amount| amount.normalize().to_string())
            .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
        PriceType::Formula => spec
            .formula
            .as_deref()
            .map(|formula| formula.trim().to_string())
            .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
        PriceType::Conditional => match spec.conditions.as_deref() {
            None => NOT_CONFIGURED.to_string(),
            Some([]) => "no conditions configured".to_string(),
            Some(conditions) => conditions
                .iter()
                .map(|rule| {
                    format!("• {} → {}", readable(&rule.condition), readable(&rule.value.to_string()))
                })
                .collect::<Vec<_>>()
                .join("\n"),
        },
    }
}

fn readable(expression: &str) -> String {
    let mut text = expression.to_string();
    for (operator, replacement) in READABLE_OPERATORS {
        text = text.replace(operator, replacement);
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

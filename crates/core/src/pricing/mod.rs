//! Pricing resolution for billable units.
//!
//! Callers pick the effective spec through the override cascade, resolve it
//! against the line's parameters, and render it separately for display.
//! Every function here is pure; nothing is cached or shared between calls.

pub mod explain;
pub mod expression;
pub mod overrides;
pub mod resolver;
pub mod substitution;
pub mod validation;

use tracing::{debug, warn};

use crate::domain::parameters::ParameterSet;
use crate::domain::unit::{BillableUnit, ReferrerId, UnitId};

use self::{
    overrides::{effective_spec_for, member_spec, OverrideBook, SpecSource},
    resolver::{resolve_with, PricingError, ResolvedPrice, ResolverOptions},
};

#[derive(Clone, Copy, Debug)]
pub struct PricingContext<'a> {
    pub referrer: Option<&'a ReferrerId>,
    pub overrides: &'a OverrideBook,
    pub parameters: &'a ParameterSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberPricing {
    pub unit_id: UnitId,
    pub source: SpecSource,
    pub outcome: Result<ResolvedPrice, PricingError>,
}

impl MemberPricing {
    pub fn display_amount(&self) -> String {
        match &self.outcome {
            Ok(price) => price.display_amount(),
            Err(error) => format!("PRICE ERROR ({error})"),
        }
    }
}

/// Price of one unit under its effective spec. Composite units also carry
/// each active member's own resolution; how those combine is up to the
/// caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitPricing {
    pub unit_id: UnitId,
    pub source: SpecSource,
    pub price: ResolvedPrice,
    pub members: Vec<MemberPricing>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BillingLine {
    pub unit: BillableUnit,
    pub parameters: ParameterSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Priced(UnitPricing),
    Failed { unit_id: UnitId, error: PricingError },
}

impl LineOutcome {
    pub fn unit_id(&self) -> &UnitId {
        match self {
            Self::Priced(pricing) => &pricing.unit_id,
            Self::Failed { unit_id, .. } => unit_id,
        }
    }

    /// Report cell for the line. Failures never render as a number.
    pub fn display_amount(&self) -> String {
        match self {
            Self::Priced(pricing) => pricing.price.display_amount(),
            Self::Failed { error, .. } => format!("PRICE ERROR ({error})"),
        }
    }
}

pub trait PricingEngine: Send + Sync {
    fn price_unit(
        &self,
        unit: &BillableUnit,
        context: &PricingContext<'_>,
    ) -> Result<UnitPricing, PricingError>;

    /// Prices every line; a failing line never aborts the batch.
    fn price_lines(
        &self,
        lines: &[BillingLine],
        referrer: Option<&ReferrerId>,
        overrides: &OverrideBook,
    ) -> Vec<LineOutcome> {
        lines
            .iter()
            .map(|line| {
                let context = PricingContext { referrer, overrides, parameters: &line.parameters };
                match self.price_unit(&line.unit, &context) {
                    Ok(pricing) => LineOutcome::Priced(pricing),
                    Err(error) => {
                        warn!(
                            event_name = "pricing.line.failed",
                            unit_id = %line.unit.id(),
                            error = %error,
                            "billing line could not be priced"
                        );
                        LineOutcome::Failed { unit_id: line.unit.id().clone(), error }
                    }
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicPricingEngine {
    options: ResolverOptions,
}

impl DeterministicPricingEngine {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn price_unit(
        &self,
        unit: &BillableUnit,
        context: &PricingContext<'_>,
    ) -> Result<UnitPricing, PricingError> {
        let effective = effective_spec_for(unit, context.referrer, context.overrides);
        let price = resolve_with(effective.spec, context.parameters, &self.options)?;
        debug!(
            event_name = "pricing.unit.resolved",
            unit_id = %unit.id(),
            source = ?effective.source,
            amount = %price.amount
        );

        let members = match unit {
            BillableUnit::Single(_) => Vec::new(),
            BillableUnit::Composite(panel) => panel
                .active_members()
                .map(|member| {
                    let effective = member_spec(panel, member, context.referrer, context.overrides);
                    MemberPricing {
                        unit_id: member.unit.id.clone(),
                        source: effective.source,
                        outcome: resolve_with(effective.spec, context.parameters, &self.options),
                    }
                })
                .collect(),
        };

        Ok(UnitPricing { unit_id: unit.id().clone(), source: effective.source, price, members })
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::pricing::PricingSpec;
use crate::domain::unit::{BillableUnit, CompositeUnit, PanelMember, PriceOverride, ReferrerId, UnitId};

/// Where the spec that governs a unit came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecSource {
    Base,
    ReferrerOverride,
    PanelOverride,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveSpec<'a> {
    pub spec: &'a PricingSpec,
    pub source: SpecSource,
}

/// Referrer price overrides, read-only to the engine.
#[derive(Clone, Debug, Default)]
pub struct OverrideBook {
    overrides: Vec<PriceOverride>,
}

impl OverrideBook {
    pub fn new(overrides: Vec<PriceOverride>) -> Self {
        Self { overrides }
    }

    /// Override for exactly this scope: `panel_id: None` only matches
    /// referrer-wide overrides.
    pub fn find(
        &self,
        referrer: &ReferrerId,
        unit_id: &UnitId,
        panel_id: Option<&UnitId>,
    ) -> Option<&PriceOverride> {
        self.overrides.iter().find(|entry| {
            &entry.referrer_id == referrer
                && &entry.unit_id == unit_id
                && entry.panel_id.as_ref() == panel_id
        })
    }

    pub fn for_referrer<'a>(&'a self, referrer: &'a ReferrerId) -> impl Iterator<Item = &'a PriceOverride> {
        self.overrides.iter().filter(move |entry| &entry.referrer_id == referrer)
    }
}

/// An override replaces the base spec wholesale; fields are never merged.
pub fn effective_spec<'a>(base: &'a PricingSpec, override_spec: Option<&'a PricingSpec>) -> &'a PricingSpec {
    override_spec.unwrap_or(base)
}

pub fn effective_spec_for<'a>(
    unit: &'a BillableUnit,
    referrer: Option<&ReferrerId>,
    book: &'a OverrideBook,
) -> EffectiveSpec<'a> {
    let found = referrer.and_then(|referrer| book.find(referrer, unit.id(), None));
    match found {
        Some(entry) => EffectiveSpec { spec: &entry.pricing, source: SpecSource::ReferrerOverride },
        None => EffectiveSpec { spec: unit.pricing(), source: SpecSource::Base },
    }
}

/// Effective spec of one panel member, looked up by the member's own id.
///
/// An override scoped to this panel wins over a referrer-wide override of
/// the same unit.
pub fn member_spec<'a>(
    panel: &CompositeUnit,
    member: &'a PanelMember,
    referrer: Option<&ReferrerId>,
    book: &'a OverrideBook,
) -> EffectiveSpec<'a> {
    let Some(referrer) = referrer else {
        return EffectiveSpec { spec: &member.unit.pricing, source: SpecSource::Base };
    };

    if let Some(entry) = book.find(referrer, &member.unit.id, Some(&panel.id)) {
        return EffectiveSpec { spec: &entry.pricing, source: SpecSource::PanelOverride };
    }
    if let Some(entry) = book.find(referrer, &member.unit.id, None) {
        return EffectiveSpec { spec: &entry.pricing, source: SpecSource::ReferrerOverride };
    }
    EffectiveSpec {
        spec: effective_spec(&member.unit.pricing, None),
        source: SpecSource::Base,
    }
}

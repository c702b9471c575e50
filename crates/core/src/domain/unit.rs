use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::pricing::PricingSpec;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferrerId(pub String);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReferrerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One priceable assay ("method").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleUnit {
    pub id: UnitId,
    pub name: String,
    pub pricing: PricingSpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelMember {
    pub unit: SingleUnit,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// A panel of assays billed together. Members keep author order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeUnit {
    pub id: UnitId,
    pub name: String,
    pub pricing: PricingSpec,
    pub members: Vec<PanelMember>,
}

impl CompositeUnit {
    pub fn active_members(&self) -> impl Iterator<Item = &PanelMember> {
        self.members.iter().filter(|member| member.active)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillableUnit {
    Single(SingleUnit),
    Composite(CompositeUnit),
}

impl BillableUnit {
    pub fn id(&self) -> &UnitId {
        match self {
            Self::Single(unit) => &unit.id,
            Self::Composite(unit) => &unit.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Single(unit) => &unit.name,
            Self::Composite(unit) => &unit.name,
        }
    }

    pub fn pricing(&self) -> &PricingSpec {
        match self {
            Self::Single(unit) => &unit.pricing,
            Self::Composite(unit) => &unit.pricing,
        }
    }
}

/// Negotiated replacement pricing for a unit billed under a referrer.
///
/// When `panel_id` is set the override only applies to the unit as a member
/// of that panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub referrer_id: ReferrerId,
    pub unit_id: UnitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<UnitId>,
    pub pricing: PricingSpec,
}

fn default_true() -> bool {
    true
}

//! Pricing resolution for laboratory billing.
//!
//! A billable unit's price is a fixed amount, a formula over per-line
//! parameters, or an ordered list of conditions, optionally replaced by a
//! referrer's negotiated override. This crate resolves those prices and
//! renders them for reports; storage and transport belong to callers.

pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use domain::parameters::ParameterSet;
pub use domain::pricing::{ConditionRule, PriceType, PricingSpec, RuleValue};
pub use domain::unit::{
    BillableUnit, CompositeUnit, PanelMember, PriceOverride, ReferrerId, SingleUnit, UnitId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::explain::format as format_spec;
pub use pricing::expression::{evaluate_boolean, evaluate_numeric, ExpressionError};
pub use pricing::overrides::{
    effective_spec, effective_spec_for, member_spec, EffectiveSpec, OverrideBook, SpecSource,
};
pub use pricing::resolver::{
    resolve, resolve_with, MatchedRule, NoMatchPolicy, PricingError, PricingWarning, ResolvedPrice,
    ResolverOptions, RuleLocation, RulePart, UnknownParameterPolicy,
};
pub use pricing::substitution::{substitute, Substitution};
pub use pricing::validation::{validate_spec, SpecIssue, ValidationResult};
pub use pricing::{
    BillingLine, DeterministicPricingEngine, LineOutcome, MemberPricing, PricingContext,
    PricingEngine, UnitPricing,
};

pub mod parameters;
pub mod pricing;
pub mod unit;

use std::path::Path;

use labprice_core::{format_spec, PricingSpec};

use crate::commands::{read_json, CommandResult};

pub fn run(spec_path: &Path) -> CommandResult {
    match read_json::<PricingSpec>("explain", spec_path) {
        Ok(spec) => CommandResult::text(0, format_spec(&spec)),
        Err(failure) => failure,
    }
}

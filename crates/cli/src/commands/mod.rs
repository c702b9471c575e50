pub mod check;
pub mod config;
pub mod explain;
pub mod price;
pub mod resolve;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use labprice_core::config::{AppConfig, LoadOptions};
use labprice_core::{ApplicationError, ParameterSet};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn text(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }

    pub fn report(command: &str, exit_code: u8, report: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(report) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_FAILURE),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Rejected user input, reported under the `invalid_input` class.
pub(crate) fn input_failure(command: &str, message: impl Into<String>) -> CommandResult {
    let error = ApplicationError::Input(message.into());
    CommandResult::failure(command, "invalid_input", error.to_string(), EXIT_INPUT)
}

pub(crate) fn read_json<T: DeserializeOwned>(command: &str, path: &Path) -> Result<T, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        input_failure(command, format!("could not read `{}`: {error}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        input_failure(command, format!("could not parse `{}`: {error}", path.display()))
    })
}

/// Parses `NAME=VALUE` pairs; later pairs replace earlier ones.
pub(crate) fn parse_parameters(command: &str, pairs: &[String]) -> Result<ParameterSet, CommandResult> {
    let mut parameters = ParameterSet::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(input_failure(command, format!("parameter `{pair}` must look like NAME=VALUE")));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(input_failure(command, format!("parameter `{pair}` has an empty name")));
        }
        let value = Decimal::from_str(value.trim()).map_err(|error| {
            input_failure(command, format!("parameter `{name}` has a non-numeric value: {error}"))
        })?;
        parameters.insert(name, value);
    }
    Ok(parameters)
}

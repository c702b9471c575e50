use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::resolver::{NoMatchPolicy, ResolverOptions, UnknownParameterPolicy};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["labprice.toml", "config/labprice.toml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub no_match_policy: NoMatchPolicy,
    pub unknown_parameter_policy: UnknownParameterPolicy,
}

impl PricingConfig {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            no_match: self.no_match_policy,
            unknown_parameter: self.unknown_parameter_policy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub no_match_policy: Option<NoMatchPolicy>,
    pub unknown_parameter_policy: Option<UnknownParameterPolicy>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig {
                no_match_policy: NoMatchPolicy::ZeroWithWarning,
                unknown_parameter_policy: UnknownParameterPolicy::ZeroWithWarning,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for NoMatchPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero_with_warning" | "zero" => Ok(Self::ZeroWithWarning),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::Validation(format!(
                "unsupported pricing.no_match_policy `{other}` (expected zero_with_warning|reject)"
            ))),
        }
    }
}

impl std::str::FromStr for UnknownParameterPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero_with_warning" | "zero" => Ok(Self::ZeroWithWarning),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::Validation(format!(
                "unsupported pricing.unknown_parameter_policy `{other}` (expected zero_with_warning|reject)"
            ))),
        }
    }
}

impl AppConfig {
    /// Precedence: defaults < file < `LABPRICE_*` environment < explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(no_match_policy) = pricing.no_match_policy {
                self.pricing.no_match_policy = no_match_policy;
            }
            if let Some(unknown_parameter_policy) = pricing.unknown_parameter_policy {
                self.pricing.unknown_parameter_policy = unknown_parameter_policy;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LABPRICE_PRICING_NO_MATCH_POLICY") {
            self.pricing.no_match_policy = value.parse()?;
        }
        if let Some(value) = read_env("LABPRICE_PRICING_UNKNOWN_PARAMETER_POLICY") {
            self.pricing.unknown_parameter_policy = value.parse()?;
        }

        let log_level =
            read_env("LABPRICE_LOGGING_LEVEL").or_else(|| read_env("LABPRICE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LABPRICE_LOGGING_FORMAT").or_else(|| read_env("LABPRICE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(no_match_policy) = overrides.no_match_policy {
            self.pricing.no_match_policy = no_match_policy;
        }
        if let Some(unknown_parameter_policy) = overrides.unknown_parameter_policy {
            self.pricing.unknown_parameter_policy = unknown_parameter_policy;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_logging(&self.logging)
    }
}

/// First existing config file: the explicit path if given, else the
/// default locations relative to the working directory.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references from the process environment.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        let end = reference.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = reference[..end].trim();
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &reference[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    no_match_policy: Option<NoMatchPolicy>,
    unknown_parameter_policy: Option<UnknownParameterPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{
        interpolate_env_vars, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    };
    use crate::pricing::resolver::{NoMatchPolicy, UnknownParameterPolicy};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_keep_zero_fallbacks_and_compact_logging() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let config = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config == AppConfig::default(), "missing optional file should yield defaults")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_LABPRICE_POLICY", "reject");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("labprice.toml");
            fs::write(
                &path,
                r#"
[pricing]
no_match_policy = "${TEST_LABPRICE_POLICY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.pricing.no_match_policy == NoMatchPolicy::Reject,
                "no-match policy should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_LABPRICE_POLICY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LABPRICE_LOG_LEVEL", "warn");
        env::set_var("LABPRICE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["LABPRICE_LOG_LEVEL", "LABPRICE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LABPRICE_PRICING_UNKNOWN_PARAMETER_POLICY", "reject");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("labprice.toml");
            fs::write(
                &path,
                r#"
[pricing]
no_match_policy = "reject"
unknown_parameter_policy = "zero_with_warning"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    no_match_policy: Some(NoMatchPolicy::ZeroWithWarning),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.pricing.no_match_policy == NoMatchPolicy::ZeroWithWarning,
                "explicit override should win over file",
            )?;
            ensure(
                config.pricing.unknown_parameter_policy == UnknownParameterPolicy::Reject,
                "env policy should win over file and defaults",
            )?;
            ensure(
                config.pricing.resolver_options().unknown_parameter == UnknownParameterPolicy::Reject,
                "resolver options should mirror pricing config",
            )
        })();

        clear_vars(&["LABPRICE_PRICING_UNKNOWN_PARAMETER_POLICY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LABPRICE_LOGGING_LEVEL", "chatty");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("logging.level")
            );
            ensure(has_message, "validation failure should mention logging.level")
        })();

        clear_vars(&["LABPRICE_LOGGING_LEVEL"]);
        result
    }

    #[test]
    fn unknown_policy_value_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LABPRICE_PRICING_NO_MATCH_POLICY", "guess");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("unsupported policy should fail".to_string()),
            Err(error) => ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("no_match_policy")),
                "error should name the offending key",
            ),
        };

        clear_vars(&["LABPRICE_PRICING_NO_MATCH_POLICY"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("labprice.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(missing),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }

    #[test]
    fn interpolation_rejects_unterminated_and_unset_references() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_LABPRICE_UNSET"]);

        ensure(
            matches!(
                interpolate_env_vars("level = \"${TEST_LABPRICE_UNSET\""),
                Err(ConfigError::UnterminatedInterpolation)
            ),
            "missing closing brace should be rejected",
        )?;
        ensure(
            matches!(
                interpolate_env_vars("level = \"${TEST_LABPRICE_UNSET}\""),
                Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "TEST_LABPRICE_UNSET"
            ),
            "unset variable should be named in the error",
        )?;
        ensure(
            matches!(
                interpolate_env_vars("plain = \"$HOME\""),
                Ok(ref text) if text == "plain = \"$HOME\""
            ),
            "bare dollar signs pass through",
        )
    }
}

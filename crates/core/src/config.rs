use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on the agent turn bound, whatever the configuration says.
pub const MAX_AGENT_TURNS: u32 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub guardrails: GuardrailConfig,
    pub agent: AgentConfig,
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuardrailConfig {
    pub min_dpi: Decimal,
    pub quote_tolerance: Decimal,
    pub small_quantity_threshold: i64,
    pub max_print_inches: Decimal,
    pub require_artwork: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub max_turns: u32,
    pub tool_timeout_ms: u64,
    pub max_retries_per_call: u32,
}

impl AgentConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq)]
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
    pub min_dpi: Option<Decimal>,
    pub require_artwork: Option<bool>,
    pub max_turns: Option<u32>,
    pub tool_timeout_ms: Option<u64>,
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
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            guardrails: GuardrailConfig {
                min_dpi: Decimal::new(300, 0),
                quote_tolerance: Decimal::ZERO,
                small_quantity_threshold: 25,
                max_print_inches: Decimal::new(48, 0),
                require_artwork: false,
            },
            agent: AgentConfig { max_turns: 8, tool_timeout_ms: 5_000, max_retries_per_call: 1 },
            pricing: PricingConfig { currency: "USD".to_string() },
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("printguard.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(guardrails) = patch.guardrails {
            if let Some(min_dpi) = guardrails.min_dpi {
                self.guardrails.min_dpi = min_dpi;
            }
            if let Some(quote_tolerance) = guardrails.quote_tolerance {
                self.guardrails.quote_tolerance = quote_tolerance;
            }
            if let Some(threshold) = guardrails.small_quantity_threshold {
                self.guardrails.small_quantity_threshold = threshold;
            }
            if let Some(max_print_inches) = guardrails.max_print_inches {
                self.guardrails.max_print_inches = max_print_inches;
            }
            if let Some(require_artwork) = guardrails.require_artwork {
                self.guardrails.require_artwork = require_artwork;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_turns) = agent.max_turns {
                self.agent.max_turns = max_turns;
            }
            if let Some(tool_timeout_ms) = agent.tool_timeout_ms {
                self.agent.tool_timeout_ms = tool_timeout_ms;
            }
            if let Some(max_retries_per_call) = agent.max_retries_per_call {
                self.agent.max_retries_per_call = max_retries_per_call;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(currency) = pricing.currency {
                self.pricing.currency = currency;
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
        if let Some(value) = read_env("PRINTGUARD_GUARDRAILS_MIN_DPI") {
            self.guardrails.min_dpi = parse_decimal("PRINTGUARD_GUARDRAILS_MIN_DPI", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_GUARDRAILS_QUOTE_TOLERANCE") {
            self.guardrails.quote_tolerance =
                parse_decimal("PRINTGUARD_GUARDRAILS_QUOTE_TOLERANCE", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_GUARDRAILS_SMALL_QUANTITY_THRESHOLD") {
            self.guardrails.small_quantity_threshold =
                parse_i64("PRINTGUARD_GUARDRAILS_SMALL_QUANTITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_GUARDRAILS_MAX_PRINT_INCHES") {
            self.guardrails.max_print_inches =
                parse_decimal("PRINTGUARD_GUARDRAILS_MAX_PRINT_INCHES", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_GUARDRAILS_REQUIRE_ARTWORK") {
            self.guardrails.require_artwork =
                parse_bool("PRINTGUARD_GUARDRAILS_REQUIRE_ARTWORK", &value)?;
        }

        if let Some(value) = read_env("PRINTGUARD_AGENT_MAX_TURNS") {
            self.agent.max_turns = parse_u32("PRINTGUARD_AGENT_MAX_TURNS", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_AGENT_TOOL_TIMEOUT_MS") {
            self.agent.tool_timeout_ms = parse_u64("PRINTGUARD_AGENT_TOOL_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("PRINTGUARD_AGENT_MAX_RETRIES_PER_CALL") {
            self.agent.max_retries_per_call =
                parse_u32("PRINTGUARD_AGENT_MAX_RETRIES_PER_CALL", &value)?;
        }

        if let Some(value) = read_env("PRINTGUARD_PRICING_CURRENCY") {
            self.pricing.currency = value;
        }

        let log_level =
            read_env("PRINTGUARD_LOGGING_LEVEL").or_else(|| read_env("PRINTGUARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRINTGUARD_LOGGING_FORMAT").or_else(|| read_env("PRINTGUARD_LOG_FORMAT"));
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
        if let Some(min_dpi) = overrides.min_dpi {
            self.guardrails.min_dpi = min_dpi;
        }
        if let Some(require_artwork) = overrides.require_artwork {
            self.guardrails.require_artwork = require_artwork;
        }
        if let Some(max_turns) = overrides.max_turns {
            self.agent.max_turns = max_turns;
        }
        if let Some(tool_timeout_ms) = overrides.tool_timeout_ms {
            self.agent.tool_timeout_ms = tool_timeout_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_guardrails(&self.guardrails)?;
        validate_agent(&self.agent)?;
        validate_pricing(&self.pricing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Path of the config file `load` would read, if one exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("printguard.toml"), PathBuf::from("config/printguard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_guardrails(guardrails: &GuardrailConfig) -> Result<(), ConfigError> {
    if guardrails.min_dpi <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "guardrails.min_dpi must be greater than zero".to_string(),
        ));
    }

    if guardrails.quote_tolerance < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "guardrails.quote_tolerance must not be negative".to_string(),
        ));
    }

    if guardrails.small_quantity_threshold < 0 {
        return Err(ConfigError::Validation(
            "guardrails.small_quantity_threshold must not be negative".to_string(),
        ));
    }

    if guardrails.max_print_inches <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "guardrails.max_print_inches must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_turns == 0 || agent.max_turns > MAX_AGENT_TURNS {
        return Err(ConfigError::Validation(format!(
            "agent.max_turns must be in range 1..={MAX_AGENT_TURNS}"
        )));
    }

    if agent.tool_timeout_ms == 0 || agent.tool_timeout_ms > 300_000 {
        return Err(ConfigError::Validation(
            "agent.tool_timeout_ms must be in range 1..=300000".to_string(),
        ));
    }

    if agent.max_retries_per_call > 1 {
        return Err(ConfigError::Validation(
            "agent.max_retries_per_call must be 0 or 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    let currency = pricing.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "pricing.currency must be a three-letter uppercase ISO code".to_string(),
        ));
    }

    Ok(())
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

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    guardrails: Option<GuardrailsPatch>,
    agent: Option<AgentPatch>,
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GuardrailsPatch {
    min_dpi: Option<Decimal>,
    quote_tolerance: Option<Decimal>,
    small_quantity_threshold: Option<i64>,
    max_print_inches: Option<Decimal>,
    require_artwork: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_turns: Option<u32>,
    tool_timeout_ms: Option<u64>,
    max_retries_per_call: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    currency: Option<String>,
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

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

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
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.agent.max_turns == 8, "default turn bound should be 8")?;
        ensure(config.agent.max_retries_per_call == 1, "default retry cap should be 1")?;
        ensure(config.guardrails.min_dpi == Decimal::new(300, 0), "default dpi should be 300")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRINTGUARD_CURRENCY", "EUR");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("printguard.toml");
            fs::write(
                &path,
                r#"
[pricing]
currency = "${TEST_PRINTGUARD_CURRENCY}"

[guardrails]
min_dpi = 240
quote_tolerance = "0.01"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.pricing.currency == "EUR", "currency should be interpolated")?;
            ensure(config.guardrails.min_dpi == Decimal::new(240, 0), "min dpi from file")?;
            ensure(
                config.guardrails.quote_tolerance == Decimal::new(1, 2),
                "tolerance should parse from a string",
            )
        })();

        clear_vars(&["TEST_PRINTGUARD_CURRENCY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTGUARD_AGENT_MAX_TURNS", "6");
        env::set_var("PRINTGUARD_LOG_LEVEL", "warn");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("printguard.toml");
            fs::write(
                &path,
                r#"
[agent]
max_turns = 4
tool_timeout_ms = 750

[logging]
level = "error"
format = "json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    tool_timeout_ms: Some(250),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.agent.max_turns == 6, "env turn bound should win over file")?;
            ensure(config.agent.tool_timeout_ms == 250, "override timeout should win")?;
            ensure(config.logging.level == "warn", "env log level alias should win over file")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "file log format kept")
        })();

        clear_vars(&["PRINTGUARD_AGENT_MAX_TURNS", "PRINTGUARD_LOG_LEVEL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTGUARD_AGENT_MAX_TURNS", "50");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("agent.max_turns")
            );
            ensure(has_message, "validation failure should mention agent.max_turns")
        })();

        clear_vars(&["PRINTGUARD_AGENT_MAX_TURNS"]);
        result
    }

    #[test]
    fn malformed_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTGUARD_GUARDRAILS_MIN_DPI", "lots");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default())
                .err()
                .ok_or_else(|| "expected invalid override failure".to_string())?;
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "PRINTGUARD_GUARDRAILS_MIN_DPI"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["PRINTGUARD_GUARDRAILS_MIN_DPI"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}

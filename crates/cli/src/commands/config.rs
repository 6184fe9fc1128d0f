use std::env;
use std::fs;
use std::path::Path;

use printguard_core::config::{resolve_config_path, AppConfig};
use serde::Serialize;
use toml::Value;

use crate::commands::{CommandResult, RuntimeOptions};

const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
struct ConfigReport {
    precedence: &'static str,
    config_file: Option<String>,
    fields: Vec<ConfigField>,
}

#[derive(Debug, Serialize)]
struct ConfigField {
    key: &'static str,
    value: String,
    source: String,
}

struct FieldSpec {
    key: &'static str,
    env_keys: &'static [&'static str],
    flag: Option<&'static str>,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "guardrails.min_dpi",
        env_keys: &["PRINTGUARD_GUARDRAILS_MIN_DPI"],
        flag: Some("--min-dpi"),
    },
    FieldSpec {
        key: "guardrails.quote_tolerance",
        env_keys: &["PRINTGUARD_GUARDRAILS_QUOTE_TOLERANCE"],
        flag: None,
    },
    FieldSpec {
        key: "guardrails.small_quantity_threshold",
        env_keys: &["PRINTGUARD_GUARDRAILS_SMALL_QUANTITY_THRESHOLD"],
        flag: None,
    },
    FieldSpec {
        key: "guardrails.max_print_inches",
        env_keys: &["PRINTGUARD_GUARDRAILS_MAX_PRINT_INCHES"],
        flag: None,
    },
    FieldSpec {
        key: "guardrails.require_artwork",
        env_keys: &["PRINTGUARD_GUARDRAILS_REQUIRE_ARTWORK"],
        flag: Some("--require-artwork"),
    },
    FieldSpec {
        key: "agent.max_turns",
        env_keys: &["PRINTGUARD_AGENT_MAX_TURNS"],
        flag: Some("--max-turns"),
    },
    FieldSpec {
        key: "agent.tool_timeout_ms",
        env_keys: &["PRINTGUARD_AGENT_TOOL_TIMEOUT_MS"],
        flag: Some("--tool-timeout-ms"),
    },
    FieldSpec {
        key: "agent.max_retries_per_call",
        env_keys: &["PRINTGUARD_AGENT_MAX_RETRIES_PER_CALL"],
        flag: None,
    },
    FieldSpec {
        key: "pricing.currency",
        env_keys: &["PRINTGUARD_PRICING_CURRENCY"],
        flag: None,
    },
    FieldSpec {
        key: "logging.level",
        env_keys: &["PRINTGUARD_LOGGING_LEVEL", "PRINTGUARD_LOG_LEVEL"],
        flag: Some("--log-level"),
    },
    FieldSpec {
        key: "logging.format",
        env_keys: &["PRINTGUARD_LOGGING_FORMAT", "PRINTGUARD_LOG_FORMAT"],
        flag: Some("--log-format"),
    },
];

/// Effective configuration with the source each value came from.
pub fn run(options: &RuntimeOptions) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = FIELDS
        .iter()
        .map(|field| ConfigField {
            key: field.key,
            value: field_value(&config, field.key),
            source: field_source(
                field,
                options,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    CommandResult::success(
        COMMAND,
        ConfigReport {
            precedence: "flag > env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            fields,
        },
    )
}

fn field_value(config: &AppConfig, key: &str) -> String {
    match key {
        "guardrails.min_dpi" => config.guardrails.min_dpi.to_string(),
        "guardrails.quote_tolerance" => config.guardrails.quote_tolerance.to_string(),
        "guardrails.small_quantity_threshold" => {
            config.guardrails.small_quantity_threshold.to_string()
        }
        "guardrails.max_print_inches" => config.guardrails.max_print_inches.to_string(),
        "guardrails.require_artwork" => config.guardrails.require_artwork.to_string(),
        "agent.max_turns" => config.agent.max_turns.to_string(),
        "agent.tool_timeout_ms" => config.agent.tool_timeout_ms.to_string(),
        "agent.max_retries_per_call" => config.agent.max_retries_per_call.to_string(),
        "pricing.currency" => config.pricing.currency.clone(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => format!("{:?}", config.logging.format).to_lowercase(),
        _ => "<unknown>".to_string(),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &FieldSpec,
    options: &RuntimeOptions,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.flag {
        if flag_is_set(options, flag) {
            return format!("flag ({flag})");
        }
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn flag_is_set(options: &RuntimeOptions, flag: &str) -> bool {
    let overrides = &options.overrides;
    match flag {
        "--min-dpi" => overrides.min_dpi.is_some(),
        "--require-artwork" => overrides.require_artwork.is_some(),
        "--max-turns" => overrides.max_turns.is_some(),
        "--tool-timeout-ms" => overrides.tool_timeout_ms.is_some(),
        "--log-level" => overrides.log_level.is_some(),
        "--log-format" => overrides.log_format.is_some(),
        _ => false,
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

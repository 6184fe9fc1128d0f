pub mod check_spec;
pub mod config;
pub mod preflight;
pub mod price;
pub mod process;
pub mod status;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use printguard_agent::{GuardrailPipeline, ResponseEnvelope, ToolRegistry};
use printguard_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
use printguard_core::MaterialCatalog;
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INVALID_REQUEST: u8 = 3;
pub const EXIT_REJECTED: u8 = 4;
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Serialize)]
struct CommandOutput<'a, T> {
    command: &'a str,
    #[serde(flatten)]
    envelope: &'a ResponseEnvelope<T>,
}

impl CommandResult {
    pub fn envelope<T: Serialize>(
        command: &str,
        envelope: &ResponseEnvelope<T>,
        exit_code: u8,
    ) -> Self {
        Self { exit_code, output: serialize_payload(command, &CommandOutput { command, envelope }) }
    }

    pub fn success<T: Serialize>(command: &str, result: T) -> Self {
        Self::envelope(command, &ResponseEnvelope::ok(result), EXIT_OK)
    }

    pub fn failure(
        command: &str,
        error_code: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::envelope::<()>(command, &ResponseEnvelope::failure(error_code, message), exit_code)
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "CONFIG_INVALID", error.to_string(), EXIT_CONFIG)
    }
}

/// Config location and overrides shared by every command.
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

impl RuntimeOptions {
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: self.overrides.clone(),
        })
    }
}

/// Pipeline wired with the bundled catalog and tools.
pub(crate) struct Services {
    pub catalog: Arc<MaterialCatalog>,
    pub pipeline: GuardrailPipeline,
}

impl Services {
    pub fn new(config: &AppConfig) -> Self {
        let catalog = Arc::new(MaterialCatalog::default());
        let registry = Arc::new(ToolRegistry::standard(config, catalog.clone()));
        let pipeline = GuardrailPipeline::from_config(config, registry, catalog.clone());
        Self { catalog, pipeline }
    }
}

pub(crate) fn block_on<F: Future>(command: &str, future: F) -> Result<F::Output, CommandResult> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "RUNTIME_UNAVAILABLE",
                format!("failed to initialize async runtime: {error}"),
                EXIT_CONFIG,
            )
        })?;
    Ok(runtime.block_on(future))
}

fn serialize_payload<T: Serialize>(command: &str, payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{command}\",\"success\":false,\"error_code\":\"SERIALIZATION\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

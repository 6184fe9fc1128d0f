use printguard_agent::tools::CapabilityStatus;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{CommandResult, RuntimeOptions, Services};

const COMMAND: &str = "status";

#[derive(Debug, Serialize)]
struct StatusReport {
    capabilities: Vec<CapabilityStatus>,
    max_turns: u32,
    tool_timeout_ms: u64,
    min_dpi: Decimal,
    require_artwork: bool,
    currency: String,
}

/// Tool capabilities and the limits the pipeline will enforce.
pub fn run(options: &RuntimeOptions) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let services = Services::new(&config);

    CommandResult::success(
        COMMAND,
        StatusReport {
            capabilities: services.pipeline.capabilities(),
            max_turns: config.agent.max_turns,
            tool_timeout_ms: config.agent.tool_timeout_ms,
            min_dpi: config.guardrails.min_dpi,
            require_artwork: config.guardrails.require_artwork,
            currency: config.pricing.currency,
        },
    )
}

use printguard_agent::ResponseEnvelope;
use printguard_core::FileReference;
use rust_decimal::Decimal;

use crate::commands::{block_on, CommandResult, RuntimeOptions, Services, EXIT_OK, EXIT_REJECTED};

const COMMAND: &str = "preflight";

#[derive(Clone, Debug)]
pub struct PreflightArgs {
    pub file: String,
    pub width_inches: Decimal,
    pub height_inches: Decimal,
}

/// Layer 2 alone: can this file print sharply at the given size?
pub fn run(options: &RuntimeOptions, args: PreflightArgs) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let services = Services::new(&config);
    let file_ref = FileReference::new(args.file);

    let verdict = match block_on(
        COMMAND,
        services.pipeline.preflight_artwork(&file_ref, args.width_inches, args.height_inches),
    ) {
        Ok(verdict) => verdict,
        Err(failure) => return failure,
    };

    let exit_code = if verdict.passed { EXIT_OK } else { EXIT_REJECTED };
    let envelope = ResponseEnvelope {
        success: verdict.passed,
        error: (!verdict.passed).then(|| "artwork failed preflight".to_string()),
        error_code: (!verdict.passed).then(|| "REJECTED".to_string()),
        result: Some(verdict),
    };
    CommandResult::envelope(COMMAND, &envelope, exit_code)
}

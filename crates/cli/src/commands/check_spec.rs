use printguard_agent::ResponseEnvelope;
use printguard_core::domain::order::normalize_token;
use printguard_core::MaterialSpec;

use crate::commands::{CommandResult, RuntimeOptions, Services, EXIT_OK, EXIT_REJECTED};

const COMMAND: &str = "check-spec";

#[derive(Clone, Debug, Default)]
pub struct CheckSpecArgs {
    pub paper_stock: String,
    pub color: String,
    pub finish: String,
    pub full_color: bool,
    /// Defaults to the catalog's color family when absent.
    pub dark_paper: Option<bool>,
}

/// Layer 1 material rules only; no tools run.
pub fn run(options: &RuntimeOptions, args: CheckSpecArgs) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let services = Services::new(&config);

    let color = normalize_token(&args.color);
    let material = MaterialSpec {
        paper_stock: normalize_token(&args.paper_stock),
        dark_paper: args.dark_paper.unwrap_or_else(|| services.catalog.is_dark(&color)),
        color,
        finish: normalize_token(&args.finish),
        full_color: args.full_color,
    };

    let verdict = services.pipeline.check_materials(&material);
    let exit_code = if verdict.passed { EXIT_OK } else { EXIT_REJECTED };
    let envelope = ResponseEnvelope {
        success: verdict.passed,
        error: (!verdict.passed).then(|| "material combination rejected".to_string()),
        error_code: (!verdict.passed).then(|| "REJECTED".to_string()),
        result: Some(verdict),
    };
    CommandResult::envelope(COMMAND, &envelope, exit_code)
}

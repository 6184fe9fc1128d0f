use std::fs;
use std::path::PathBuf;

use printguard_agent::{PipelineError, ProcessOrderRequest, ResponseEnvelope};
use printguard_core::{FileReference, OrderSpecInput};
use tokio_util::sync::CancellationToken;

use crate::commands::{
    block_on, CommandResult, RuntimeOptions, Services, EXIT_CANCELLED, EXIT_INVALID_REQUEST,
    EXIT_OK, EXIT_REJECTED,
};

const COMMAND: &str = "process";

#[derive(Clone, Debug, Default)]
pub struct ProcessArgs {
    pub query: String,
    pub file: Option<String>,
    /// JSON file holding explicit order fields; these win over the query.
    pub order_json: Option<PathBuf>,
}

pub fn run(options: &RuntimeOptions, args: ProcessArgs) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let order = match read_order(args.order_json.as_ref()) {
        Ok(order) => order,
        Err(message) => {
            return CommandResult::failure(COMMAND, "INVALID_REQUEST", message, EXIT_INVALID_REQUEST)
        }
    };
    let request = ProcessOrderRequest {
        user_query: args.query,
        order,
        file_ref: args.file.map(FileReference::new),
    };

    let services = Services::new(&config);
    let cancel = CancellationToken::new();
    let outcome = match block_on(COMMAND, async {
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });
        services.pipeline.run(&request, &cancel).await
    }) {
        Ok(outcome) => outcome,
        Err(failure) => return failure,
    };

    let exit_code = match &outcome {
        Ok(result) if result.accepted => EXIT_OK,
        Ok(_) => EXIT_REJECTED,
        Err(PipelineError::InvalidRequest(_)) => EXIT_INVALID_REQUEST,
        Err(PipelineError::Cancelled) => EXIT_CANCELLED,
    };
    CommandResult::envelope(COMMAND, &ResponseEnvelope::from_run(outcome), exit_code)
}

fn read_order(path: Option<&PathBuf>) -> Result<OrderSpecInput, String> {
    let Some(path) = path else {
        return Ok(OrderSpecInput::default());
    };
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read order file `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw).map_err(|error| {
        format!("order file `{}` is not valid order JSON: {error}", path.display())
    })
}

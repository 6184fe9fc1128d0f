use printguard_core::PriceRequest;
use rust_decimal::Decimal;

use crate::commands::{block_on, CommandResult, RuntimeOptions, Services, EXIT_INVALID_REQUEST};

const COMMAND: &str = "price";

#[derive(Clone, Debug)]
pub struct PriceArgs {
    pub paper_stock: String,
    pub quantity: i64,
    pub width_inches: Decimal,
    pub height_inches: Decimal,
    pub full_color: bool,
    pub rush_type: Option<String>,
}

/// Prices directly through the pricing tool, bypassing the agent.
pub fn run(options: &RuntimeOptions, args: PriceArgs) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let services = Services::new(&config);

    let request = PriceRequest {
        paper_stock: args.paper_stock,
        quantity: args.quantity,
        width_inches: args.width_inches,
        height_inches: args.height_inches,
        full_color: args.full_color,
        rush_type: args.rush_type,
    };

    let result = match block_on(COMMAND, services.pipeline.quote_price(&request)) {
        Ok(result) => result,
        Err(failure) => return failure,
    };

    match (result.price(), result.error()) {
        (Some(price), _) => CommandResult::success(COMMAND, price),
        (None, Some(error)) => {
            CommandResult::failure(COMMAND, "TOOL_FAILURE", error.to_string(), EXIT_INVALID_REQUEST)
        }
        (None, None) => CommandResult::failure(
            COMMAND,
            "TOOL_FAILURE",
            "pricing tool returned a non-price output",
            EXIT_INVALID_REQUEST,
        ),
    }
}

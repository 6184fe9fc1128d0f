use anyhow::Result;
use async_trait::async_trait;
use printguard_core::{FileReference, InventoryReport, OrderSpec, Price, ToolError, ToolResult};
use rust_decimal::Decimal;

use crate::tools::{ToolCall, CALCULATE_PRICE, CHECK_INVENTORY, CHECK_RESOLUTION};
use crate::transcript::AgentTranscript;

/// What the reasoning step decided to do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedStep {
    CallTool(ToolCall),
    Draft(String),
    Abandon { reason: String },
}

/// Everything a planner may look at. Tool results arrive only through the
/// transcript.
#[derive(Clone, Copy, Debug)]
pub struct PlanningContext<'a> {
    pub user_query: &'a str,
    pub order: &'a OrderSpec,
    pub file_ref: Option<&'a FileReference>,
    pub transcript: &'a AgentTranscript,
}

/// Reasoning seam of the order agent. Implementations translate the
/// conversation into tool calls and a customer-facing draft; they never
/// decide prices themselves.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep>;
}

/// Fixed plan: inventory, then artwork resolution when a file is attached,
/// then pricing, then a draft quoting the priced total.
#[derive(Clone, Debug, Default)]
pub struct DeterministicPlanner;

#[async_trait]
impl Planner for DeterministicPlanner {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep> {
        Ok(plan(context))
    }
}

fn plan(context: &PlanningContext<'_>) -> PlannedStep {
    let order = context.order;
    let transcript = context.transcript;

    let inventory_call = ToolCall::CheckInventory {
        paper_stock: order.paper_stock.clone(),
        color: order.color.clone(),
        finish: order.finish.clone(),
    };
    let inventory = match transcript.latest_result(CHECK_INVENTORY) {
        None => return PlannedStep::CallTool(inventory_call),
        Some(ToolResult::Err(error)) => return after_failure(inventory_call, error),
        Some(result) => result.inventory(),
    };
    if let Some(report) = inventory.filter(|report| !report.covers(order.quantity)) {
        return PlannedStep::Draft(out_of_stock_draft(order, report));
    }

    if let Some(file_ref) = context.file_ref {
        if transcript.latest_result(CHECK_RESOLUTION).is_none() {
            return PlannedStep::CallTool(ToolCall::CheckResolution {
                file_ref: file_ref.clone(),
                width_inches: order.width_inches,
                height_inches: order.height_inches,
            });
        }
    }

    let price_call = ToolCall::CalculatePrice(order.price_request());
    match transcript.latest_result(CALCULATE_PRICE) {
        None => PlannedStep::CallTool(price_call),
        Some(ToolResult::Err(error)) => after_failure(price_call, error),
        Some(result) => match result.price() {
            Some(price) => PlannedStep::Draft(quote_draft(order, price)),
            None => PlannedStep::Abandon {
                reason: "pricing returned no price".to_string(),
            },
        },
    }
}

/// Timeouts are worth one more attempt; the agent enforces the retry cap.
fn after_failure(call: ToolCall, error: &ToolError) -> PlannedStep {
    match error {
        ToolError::Timeout { .. } => PlannedStep::CallTool(call),
        other => PlannedStep::Abandon { reason: format!("{} failed: {other}", call.name()) },
    }
}

fn quote_draft(order: &OrderSpec, price: &Price) -> String {
    let mut draft = format!(
        "Your order of {} {} prints ({} x {} in, {}, {} finish, {}) comes to {}.",
        order.quantity,
        humanize(&order.paper_stock),
        order.width_inches.normalize(),
        order.height_inches.normalize(),
        humanize(&order.color),
        humanize(&order.finish),
        if order.full_color { "full color" } else { "single color" },
        format_amount(price.total, &price.currency),
    );
    draft.push_str(&format!(
        " That includes a {} setup fee",
        format_amount(price.setup_fee, &price.currency)
    ));
    if !price.quantity_discount.is_zero() {
        draft.push_str(&format!(
            ", a {} volume discount",
            format_amount(price.quantity_discount, &price.currency)
        ));
    }
    if !price.rush_surcharge.is_zero() {
        draft.push_str(&format!(
            " and a {} rush surcharge",
            format_amount(price.rush_surcharge, &price.currency)
        ));
    }
    draft.push('.');
    draft
}

fn out_of_stock_draft(order: &OrderSpec, report: &InventoryReport) -> String {
    format!(
        "We can't fill this order right now: {} in {} with a {} finish has {} sheets on hand \
         and the order needs {}. A smaller run or a different stock would let us quote it.",
        humanize(&order.paper_stock),
        humanize(&order.color),
        humanize(&order.finish),
        report.available_sheets,
        order.quantity,
    )
}

fn humanize(token: &str) -> String {
    token.replace('_', " ")
}

/// Renders an amount the way drafts state prices, symbol first for the
/// common currencies and code last otherwise.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let amount = amount.round_dp(2);
    match currency.to_ascii_uppercase().as_str() {
        "USD" => format!("${amount:.2}"),
        "EUR" => format!("€{amount:.2}"),
        "GBP" => format!("£{amount:.2}"),
        code => format!("{amount:.2} {code}"),
    }
}

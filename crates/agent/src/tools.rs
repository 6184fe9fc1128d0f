use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use printguard_core::config::AppConfig;
use printguard_core::tools::{
    CatalogInventoryTool, DeterministicPricingTool, FsArtworkStore, ImageResolutionTool,
    InventoryTool, PricingTool, ResolutionTool,
};
use printguard_core::{
    FileReference, MaterialCatalog, PriceRequest, ToolError, ToolOutput, ToolResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const CHECK_INVENTORY: &str = "check_inventory";
pub const CHECK_RESOLUTION: &str = "check_resolution";
pub const CALCULATE_PRICE: &str = "calculate_price";

/// One tool invocation requested by the planner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    CheckInventory { paper_stock: String, color: String, finish: String },
    CheckResolution { file_ref: FileReference, width_inches: Decimal, height_inches: Decimal },
    CalculatePrice(PriceRequest),
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckInventory { .. } => CHECK_INVENTORY,
            Self::CheckResolution { .. } => CHECK_RESOLUTION,
            Self::CalculatePrice(_) => CALCULATE_PRICE,
        }
    }

    /// Arguments as a JSON object, without the tool tag.
    pub fn input(&self) -> Value {
        match self {
            Self::CheckInventory { paper_stock, color, finish } => {
                json!({ "paper_stock": paper_stock, "color": color, "finish": finish })
            }
            Self::CheckResolution { file_ref, width_inches, height_inches } => json!({
                "file_ref": file_ref,
                "width_inches": width_inches,
                "height_inches": height_inches,
            }),
            Self::CalculatePrice(request) => {
                serde_json::to_value(request).unwrap_or_else(|_| Value::Object(Default::default()))
            }
        }
    }

    /// Calls that read the uploaded artwork and therefore pass through preflight.
    pub fn is_artwork_dependent(&self) -> bool {
        matches!(self, Self::CheckResolution { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CapabilityState {
    Available,
    Unavailable { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: CapabilityState,
}

/// Tools injected at startup. A tool that was never registered is reported as
/// unavailable and every call to it fails with `ToolError::Unavailable`.
pub struct ToolRegistry {
    inventory: Option<Arc<dyn InventoryTool>>,
    resolution: Option<Arc<dyn ResolutionTool>>,
    pricing: Option<Arc<dyn PricingTool>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self { inventory: None, resolution: None, pricing: None, timeout }
    }

    /// Registry wired with the bundled catalog, filesystem artwork and pricing tools.
    pub fn standard(config: &AppConfig, catalog: Arc<MaterialCatalog>) -> Self {
        Self::new(config.agent.tool_timeout())
            .with_inventory(CatalogInventoryTool::new(catalog.clone()))
            .with_resolution(ImageResolutionTool::new(
                FsArtworkStore::new(),
                config.guardrails.min_dpi,
            ))
            .with_pricing(DeterministicPricingTool::new(catalog, config.pricing.currency.clone()))
    }

    pub fn with_inventory<T>(mut self, tool: T) -> Self
    where
        T: InventoryTool + 'static,
    {
        self.inventory = Some(Arc::new(tool));
        self
    }

    pub fn with_resolution<T>(mut self, tool: T) -> Self
    where
        T: ResolutionTool + 'static,
    {
        self.resolution = Some(Arc::new(tool));
        self
    }

    pub fn with_pricing<T>(mut self, tool: T) -> Self
    where
        T: PricingTool + 'static,
    {
        self.pricing = Some(Arc::new(tool));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn capabilities(&self) -> Vec<CapabilityStatus> {
        [
            (CHECK_INVENTORY, self.inventory.is_some()),
            (CHECK_RESOLUTION, self.resolution.is_some()),
            (CALCULATE_PRICE, self.pricing.is_some()),
        ]
        .into_iter()
        .map(|(name, registered)| CapabilityStatus {
            name: name.to_string(),
            state: if registered {
                CapabilityState::Available
            } else {
                CapabilityState::Unavailable { reason: "no implementation registered".to_string() }
            },
        })
        .collect()
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = call.name();
        let outcome = match call {
            ToolCall::CheckInventory { paper_stock, color, finish } => {
                let Some(tool) = &self.inventory else {
                    return unavailable(name);
                };
                self.bounded(name, tool.check_inventory(paper_stock, color, finish))
                    .await
                    .map(ToolOutput::Inventory)
            }
            ToolCall::CheckResolution { file_ref, width_inches, height_inches } => {
                let Some(tool) = &self.resolution else {
                    return unavailable(name);
                };
                self.bounded(name, tool.check_resolution(file_ref, *width_inches, *height_inches))
                    .await
                    .map(ToolOutput::Resolution)
            }
            ToolCall::CalculatePrice(request) => {
                let Some(tool) = &self.pricing else {
                    return unavailable(name);
                };
                self.bounded(name, tool.calculate_price(request)).await.map(ToolOutput::Price)
            }
        };

        match &outcome {
            Ok(_) => debug!(event_name = "tool.call.succeeded", tool = name, "tool call succeeded"),
            Err(error) => warn!(
                event_name = "tool.call.failed",
                tool = name,
                error = %error,
                "tool call failed"
            ),
        }
        ToolResult::from(outcome)
    }

    async fn bounded<T>(
        &self,
        name: &str,
        call: impl Future<Output = Result<T, ToolError>>,
    ) -> Result<T, ToolError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool: name.to_string(),
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

fn unavailable(name: &str) -> ToolResult {
    warn!(event_name = "tool.call.unavailable", tool = name, "tool is not registered");
    ToolResult::Err(ToolError::Unavailable { tool: name.to_string() })
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use printguard_agent::tools::{CALCULATE_PRICE, CHECK_RESOLUTION};
use printguard_agent::{
    GuardrailPipeline, PipelineError, PlannedStep, Planner, PlanningContext, ProcessOrderRequest,
    TerminalReason, ToolCall, ToolRegistry,
};
use printguard_core::config::AppConfig;
use printguard_core::tools::resolution::blank_png;
use printguard_core::tools::{
    price_order, ImageResolutionTool, InMemoryArtworkStore, InventoryTool, PricingTool,
};
use printguard_core::{
    FileReference, InventoryReport, MaterialCatalog, OrderSpecInput, Price, PriceRequest,
    ToolError,
};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct CountingInventory {
    counter: CallCounter,
}

#[async_trait]
impl InventoryTool for CountingInventory {
    async fn check_inventory(
        &self,
        paper_stock: &str,
        color: &str,
        finish: &str,
    ) -> Result<InventoryReport, ToolError> {
        self.counter.bump();
        Ok(InventoryReport {
            paper_stock: paper_stock.to_string(),
            color: color.to_string(),
            finish: finish.to_string(),
            available_sheets: 50_000,
        })
    }
}

struct CountingPricing {
    counter: CallCounter,
    catalog: Arc<MaterialCatalog>,
}

#[async_trait]
impl PricingTool for CountingPricing {
    async fn calculate_price(&self, request: &PriceRequest) -> Result<Price, ToolError> {
        self.counter.bump();
        price_order(&self.catalog, request, "USD")
    }
}

/// Prices the order, then states a figure of its own.
struct LyingPlanner {
    stated: &'static str,
    price_first: bool,
}

#[async_trait]
impl Planner for LyingPlanner {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep> {
        if self.price_first && context.transcript.latest_result(CALCULATE_PRICE).is_none() {
            return Ok(PlannedStep::CallTool(ToolCall::CalculatePrice(
                context.order.price_request(),
            )));
        }
        Ok(PlannedStep::Draft(format!("Great news, your cards will cost {}.", self.stated)))
    }
}

struct LoopingPlanner;

#[async_trait]
impl Planner for LoopingPlanner {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep> {
        Ok(PlannedStep::CallTool(ToolCall::CalculatePrice(context.order.price_request())))
    }
}

/// Holds every pricing call far longer than any test waits.
struct StalledPricing;

#[async_trait]
impl PricingTool for StalledPricing {
    async fn calculate_price(&self, _request: &PriceRequest) -> Result<Price, ToolError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ToolError::Unavailable { tool: CALCULATE_PRICE.to_string() })
    }
}

/// Prices and drafts without ever looking at the artwork.
struct ArtworkSkippingPlanner;

#[async_trait]
impl Planner for ArtworkSkippingPlanner {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep> {
        match context.transcript.last_successful_price() {
            None => Ok(PlannedStep::CallTool(ToolCall::CalculatePrice(
                context.order.price_request(),
            ))),
            Some(price) => Ok(PlannedStep::Draft(format!("Total: ${:.2}", price.total))),
        }
    }
}

/// Prices the order, then quotes the breakdown but never the total.
struct BreakdownOnlyPlanner;

#[async_trait]
impl Planner for BreakdownOnlyPlanner {
    async fn next_step(&self, context: &PlanningContext<'_>) -> Result<PlannedStep> {
        match context.transcript.last_successful_price() {
            None => Ok(PlannedStep::CallTool(ToolCall::CalculatePrice(
                context.order.price_request(),
            ))),
            Some(price) => Ok(PlannedStep::Draft(format!(
                "Your cards come to ${:.2} plus a ${:.2} setup fee.",
                price.subtotal, price.setup_fee
            ))),
        }
    }
}

struct Harness {
    inventory_calls: CallCounter,
    pricing_calls: CallCounter,
    registry: Arc<ToolRegistry>,
    catalog: Arc<MaterialCatalog>,
}

fn harness(store: InMemoryArtworkStore) -> Harness {
    let catalog = Arc::new(MaterialCatalog::default());
    let inventory_calls = CallCounter::default();
    let pricing_calls = CallCounter::default();
    let registry = ToolRegistry::new(Duration::from_secs(1))
        .with_inventory(CountingInventory { counter: inventory_calls.clone() })
        .with_resolution(ImageResolutionTool::new(store, Decimal::new(300, 0)))
        .with_pricing(CountingPricing { counter: pricing_calls.clone(), catalog: catalog.clone() });

    Harness { inventory_calls, pricing_calls, registry: Arc::new(registry), catalog }
}

impl Harness {
    fn pipeline(&self) -> GuardrailPipeline {
        GuardrailPipeline::from_config(
            &AppConfig::default(),
            self.registry.clone(),
            self.catalog.clone(),
        )
    }

    fn pipeline_with<P: Planner>(&self, config: &AppConfig, planner: P) -> GuardrailPipeline<P> {
        GuardrailPipeline::with_planner(
            config,
            self.registry.clone(),
            self.catalog.clone(),
            planner,
        )
    }

    fn tool_calls(&self) -> usize {
        self.inventory_calls.count() + self.pricing_calls.count()
    }
}

fn business_cards() -> OrderSpecInput {
    OrderSpecInput {
        paper_stock: Some("100lb_cardstock".to_string()),
        color: Some("white".to_string()),
        finish: Some("matte".to_string()),
        full_color: Some(true),
        quantity: Some(500),
        width_inches: Some(Decimal::new(35, 1)),
        height_inches: Some(Decimal::TWO),
        ..OrderSpecInput::default()
    }
}

fn request(order: OrderSpecInput, file_ref: Option<&str>) -> ProcessOrderRequest {
    ProcessOrderRequest {
        user_query: "Please quote these business cards".to_string(),
        order,
        file_ref: file_ref.map(FileReference::new),
    }
}

#[tokio::test]
async fn spec_failure_runs_no_tools_and_rejects() {
    let harness = harness(InMemoryArtworkStore::default());
    let order = OrderSpecInput {
        color: Some("black".to_string()),
        quantity: Some(1),
        width_inches: Some(Decimal::ONE),
        height_inches: Some(Decimal::ONE),
        ..business_cards()
    };

    let result = harness
        .pipeline()
        .run(&request(order, None), &CancellationToken::new())
        .await
        .expect("request is well formed");

    assert!(!result.accepted);
    assert!(result.layer1.has_code("FULL_COLOR_ON_DARK_STOCK"));
    assert!(result.order_spec.dark_paper, "dark_paper derives from the catalog color");
    assert!(result.agent_transcript.is_none());
    assert!(result.final_response.is_none());
    assert_eq!(harness.tool_calls(), 0);
}

#[tokio::test]
async fn layer_one_is_deterministic_across_runs() {
    let harness = harness(InMemoryArtworkStore::default());
    let pipeline = harness.pipeline();
    let order = OrderSpecInput { color: Some("navy".to_string()), ..business_cards() };
    let spec = pipeline.build_order_spec(&request(order, None)).expect("complete spec");

    let first = pipeline.check_order(&spec);
    let second = pipeline.check_order(&spec);

    assert_eq!(first, second);
    assert!(!first.passed);
}

#[tokio::test]
async fn low_resolution_artwork_is_rejected_and_threshold_artwork_passes() {
    let store = InMemoryArtworkStore::default()
        .with_file("low.png", blank_png(525, 300).expect("encode png fixture"))
        .with_file("exact.png", blank_png(1_050, 600).expect("encode png fixture"));
    let harness = harness(store);
    let pipeline = harness.pipeline();

    let low = pipeline
        .run(&request(business_cards(), Some("low.png")), &CancellationToken::new())
        .await
        .expect("request is well formed");
    let exact = pipeline
        .run(&request(business_cards(), Some("exact.png")), &CancellationToken::new())
        .await
        .expect("request is well formed");

    assert!(!low.accepted);
    let layer2 = low.layer2.expect("artwork was checked");
    assert!(layer2.has_code("INSUFFICIENT_RESOLUTION"));
    assert!(layer2.violations[0].message.contains("150"));
    assert!(low.final_response.is_none());
    assert_eq!(
        low.agent_transcript.and_then(|transcript| transcript.terminal()),
        Some(TerminalReason::PreflightBlocked)
    );

    assert!(exact.accepted, "{:?}", exact.violations());
    assert!(exact.layer2.is_some_and(|verdict| verdict.passed));
}

#[tokio::test]
async fn unverified_artwork_is_checked_after_the_agent() {
    let store = InMemoryArtworkStore::default()
        .with_file("low.png", blank_png(525, 300).expect("encode png fixture"));
    let harness = harness(store);
    let pipeline = harness.pipeline_with(&AppConfig::default(), ArtworkSkippingPlanner);

    let result = pipeline
        .run(&request(business_cards(), Some("low.png")), &CancellationToken::new())
        .await
        .expect("request is well formed");

    let transcript = result.agent_transcript.as_ref().expect("agent ran");
    assert!(transcript.latest_result(CHECK_RESOLUTION).is_none());
    assert!(result.layer2.as_ref().is_some_and(|verdict| !verdict.passed));
    assert!(result.layer3.as_ref().is_some_and(|verdict| verdict.passed));
    assert!(!result.accepted, "a later layer must not clear an earlier blocking violation");
}

#[tokio::test]
async fn stated_price_without_pricing_call_is_ungrounded() {
    let harness = harness(InMemoryArtworkStore::default());
    let pipeline = harness.pipeline_with(
        &AppConfig::default(),
        LyingPlanner { stated: "$125.50", price_first: false },
    );

    let result = pipeline
        .run(&request(business_cards(), None), &CancellationToken::new())
        .await
        .expect("request is well formed");

    assert!(!result.accepted);
    assert!(result.layer3.is_some_and(|verdict| verdict.has_code("UNGROUNDED_QUOTE")));
    assert!(result.final_response.is_none());
    assert_eq!(harness.pricing_calls.count(), 0);
}

#[tokio::test]
async fn stated_price_that_disagrees_with_pricing_is_a_mismatch() {
    let harness = harness(InMemoryArtworkStore::default());
    let pipeline = harness.pipeline_with(
        &AppConfig::default(),
        LyingPlanner { stated: "$59.99", price_first: true },
    );

    let result = pipeline
        .run(&request(business_cards(), None), &CancellationToken::new())
        .await
        .expect("request is well formed");

    assert!(!result.accepted);
    let layer3 = result.layer3.expect("draft was checked");
    assert!(layer3.has_code("QUOTE_MISMATCH"));
    assert!(layer3.violations[0].message.contains("59.99"));
    assert!(layer3.violations[0].message.contains("66.03"));
    assert_eq!(harness.pricing_calls.count(), 1);
}

#[tokio::test]
async fn quoting_the_breakdown_without_the_total_is_a_mismatch() {
    let harness = harness(InMemoryArtworkStore::default());
    let pipeline = harness.pipeline_with(&AppConfig::default(), BreakdownOnlyPlanner);

    let result = pipeline
        .run(&request(business_cards(), None), &CancellationToken::new())
        .await
        .expect("request is well formed");

    assert!(!result.accepted);
    assert!(result.final_response.is_none());
    let layer3 = result.layer3.expect("draft was checked");
    assert!(layer3.has_code("QUOTE_MISMATCH"));
    assert!(layer3.violations.iter().all(|violation| violation.message.contains("66.03")));
}

#[tokio::test]
async fn looping_planner_never_exceeds_the_turn_bound() {
    let harness = harness(InMemoryArtworkStore::default());
    let mut config = AppConfig::default();
    config.agent.max_turns = 5;
    let pipeline = harness.pipeline_with(&config, LoopingPlanner);

    let result = pipeline
        .run(&request(business_cards(), None), &CancellationToken::new())
        .await
        .expect("request is well formed");

    let transcript = result.agent_transcript.expect("agent ran");
    assert_eq!(transcript.len(), 5);
    assert_eq!(transcript.terminal(), Some(TerminalReason::ReasoningExhausted));
    assert_eq!(harness.pricing_calls.count(), 4);
    assert!(result.layer3.is_none());
    assert!(!result.accepted);
}

#[tokio::test]
async fn acceptance_is_idempotent_for_identical_requests() {
    let harness = harness(InMemoryArtworkStore::default());
    let pipeline = harness.pipeline();
    let request = request(business_cards(), None);

    let first = pipeline.run(&request, &CancellationToken::new()).await.expect("well formed");
    let second = pipeline.run(&request, &CancellationToken::new()).await.expect("well formed");

    assert!(first.accepted);
    assert_eq!(first.accepted, second.accepted);
    assert_eq!(first.final_response, second.final_response);
    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn cancelling_during_a_tool_call_abandons_the_run_promptly() {
    let inventory_calls = CallCounter::default();
    let registry = ToolRegistry::new(Duration::from_secs(60))
        .with_inventory(CountingInventory { counter: inventory_calls.clone() })
        .with_pricing(StalledPricing);
    let pipeline = GuardrailPipeline::from_config(
        &AppConfig::default(),
        Arc::new(registry),
        Arc::new(MaterialCatalog::default()),
    );

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let request = request(business_cards(), None);
    let outcome = tokio::time::timeout(Duration::from_secs(5), pipeline.run(&request, &cancel))
        .await
        .expect("cancellation must not wait for the stalled pricing call");

    assert!(matches!(outcome, Err(PipelineError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(inventory_calls.count(), 1);
}

use std::sync::Arc;

use printguard_core::config::AppConfig;
use printguard_core::{
    DomainError, FileReference, GuardrailVerdict, MaterialCatalog, MaterialSpec, OrderSpec,
    OrderSpecInput, PriceRequest, ToolResult, Violation,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::OrderIntentExtractor;
use crate::guardrails::{PreflightGuardrail, QuoteGuardrail, SpecCheckGuardrail};
use crate::planner::{DeterministicPlanner, Planner};
use crate::runtime::OrderAgent;
use crate::tools::{CapabilityStatus, ToolCall, ToolRegistry};
use crate::transcript::{AgentTranscript, TerminalReason};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOrderRequest {
    pub user_query: String,
    #[serde(default)]
    pub order: OrderSpecInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ref: Option<FileReference>,
}

/// Everything one request produced. Only `final_response` is meant for the
/// customer, and it is present only when the run was accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub request_id: Uuid,
    pub order_spec: OrderSpec,
    pub layer1: GuardrailVerdict,
    pub agent_transcript: Option<AgentTranscript>,
    pub layer2: Option<GuardrailVerdict>,
    pub layer3: Option<GuardrailVerdict>,
    pub final_response: Option<String>,
    pub accepted: bool,
}

impl PipelineResult {
    /// Violations across every layer that ran, in layer order.
    pub fn violations(&self) -> Vec<&Violation> {
        [Some(&self.layer1), self.layer2.as_ref(), self.layer3.as_ref()]
            .into_iter()
            .flatten()
            .flat_map(|verdict| verdict.violations.iter())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),
    #[error("request was cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Uniform response shape for every outer surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(result: T) -> Self {
        Self { success: true, result: Some(result), error: None, error_code: None }
    }

    pub fn failure(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            error_code: Some(code.into()),
        }
    }
}

impl ResponseEnvelope<PipelineResult> {
    /// A rejected run still carries its result so callers can see every
    /// violation; only the success flag differs.
    pub fn from_run(outcome: Result<PipelineResult, PipelineError>) -> Self {
        match outcome {
            Ok(result) => Self {
                success: result.accepted,
                error: (!result.accepted).then(|| "order rejected by guardrails".to_string()),
                error_code: (!result.accepted).then(|| "REJECTED".to_string()),
                result: Some(result),
            },
            Err(error) => Self::failure(error.code(), error.to_string()),
        }
    }
}

/// Composes the three guardrail layers around the order agent.
///
/// Layer 1 runs before any tool. Layer 2 runs inside the agent loop when the
/// planner reaches the artwork step, or after it when artwork was attached
/// but never checked. Layer 3 gates the draft. A blocking violation in any
/// layer that ran makes the run unaccepted.
pub struct GuardrailPipeline<P = DeterministicPlanner> {
    catalog: Arc<MaterialCatalog>,
    registry: Arc<ToolRegistry>,
    spec_check: SpecCheckGuardrail,
    preflight: Arc<PreflightGuardrail>,
    quote: QuoteGuardrail,
    extractor: OrderIntentExtractor,
    agent: OrderAgent<P>,
}

impl GuardrailPipeline<DeterministicPlanner> {
    pub fn from_config(
        config: &AppConfig,
        registry: Arc<ToolRegistry>,
        catalog: Arc<MaterialCatalog>,
    ) -> Self {
        Self::with_planner(config, registry, catalog, DeterministicPlanner)
    }
}

impl<P> GuardrailPipeline<P>
where
    P: Planner,
{
    pub fn with_planner(
        config: &AppConfig,
        registry: Arc<ToolRegistry>,
        catalog: Arc<MaterialCatalog>,
        planner: P,
    ) -> Self {
        let preflight =
            Arc::new(PreflightGuardrail::new(registry.clone(), config.guardrails.require_artwork));
        Self {
            spec_check: SpecCheckGuardrail::new(catalog.clone(), &config.guardrails),
            quote: QuoteGuardrail::new(config.guardrails.quote_tolerance),
            extractor: OrderIntentExtractor::new(catalog.clone()),
            agent: OrderAgent::new(planner, registry.clone(), preflight.clone(), &config.agent),
            preflight,
            registry,
            catalog,
        }
    }

    /// Merges explicit fields with what the query mentions and validates the
    /// result is complete. Explicit fields always win.
    pub fn build_order_spec(
        &self,
        request: &ProcessOrderRequest,
    ) -> Result<OrderSpec, DomainError> {
        let extracted = self.extractor.extract(&request.user_query);
        request.order.clone().or(extracted).into_spec(|color| self.catalog.is_dark(color))
    }

    pub async fn run(
        &self,
        request: &ProcessOrderRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let request_id = Uuid::new_v4();
        let order_spec = self.build_order_spec(request).map_err(|error| {
            warn!(
                event_name = "pipeline.request.invalid",
                request_id = %request_id,
                error = %error,
                "order request rejected before guardrails"
            );
            error
        })?;

        let layer1 = self.spec_check.validate_order_spec(&order_spec);
        log_verdict(request_id, &layer1);
        if !layer1.passed {
            return Ok(finish(PipelineResult {
                request_id,
                order_spec,
                layer1,
                agent_transcript: None,
                layer2: None,
                layer3: None,
                final_response: None,
                accepted: false,
            }));
        }

        if request.file_ref.is_none() {
            if let Some(layer2) = self.preflight.without_artwork() {
                log_verdict(request_id, &layer2);
                return Ok(finish(PipelineResult {
                    request_id,
                    order_spec,
                    layer1,
                    agent_transcript: None,
                    layer2: Some(layer2),
                    layer3: None,
                    final_response: None,
                    accepted: false,
                }));
            }
        }

        let run = self
            .agent
            .process_order(&request.user_query, &order_spec, request.file_ref.as_ref(), cancel)
            .await;
        if run.transcript.terminal() == Some(TerminalReason::Cancelled) {
            warn!(event_name = "pipeline.run.cancelled", request_id = %request_id, "run cancelled");
            return Err(PipelineError::Cancelled);
        }

        let layer2 = match (run.preflight, request.file_ref.as_ref()) {
            (Some(verdict), _) => Some(verdict),
            (None, Some(file_ref)) => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    outcome = self.preflight.validate_artwork(file_ref, &order_spec) => outcome,
                };
                Some(outcome.verdict)
            }
            (None, None) => None,
        };
        if let Some(verdict) = &layer2 {
            log_verdict(request_id, verdict);
        }

        let transcript = run.transcript;
        let layer3 = transcript
            .draft_response()
            .map(|draft| self.quote.validate_response(draft, &transcript));
        if let Some(verdict) = &layer3 {
            log_verdict(request_id, verdict);
        }

        let accepted = layer1.passed
            && layer2.as_ref().map_or(true, |verdict| verdict.passed)
            && layer3.as_ref().is_some_and(|verdict| verdict.passed);
        let final_response = if accepted {
            transcript.draft_response().map(str::to_string)
        } else {
            None
        };

        Ok(finish(PipelineResult {
            request_id,
            order_spec,
            layer1,
            agent_transcript: Some(transcript),
            layer2,
            layer3,
            final_response,
            accepted,
        }))
    }

    /// Layer 1 material rules alone.
    pub fn check_materials(&self, material: &MaterialSpec) -> GuardrailVerdict {
        self.spec_check.validate_material_spec(material)
    }

    /// Layer 1 on a complete order, without running the agent.
    pub fn check_order(&self, spec: &OrderSpec) -> GuardrailVerdict {
        self.spec_check.validate_order_spec(spec)
    }

    /// Prices an order directly through the registered pricing tool.
    pub async fn quote_price(&self, request: &PriceRequest) -> ToolResult {
        self.registry.execute(&ToolCall::CalculatePrice(request.clone())).await
    }

    /// Layer 2 alone, for an uploaded file and the size it will print at.
    pub async fn preflight_artwork(
        &self,
        file_ref: &FileReference,
        width_inches: Decimal,
        height_inches: Decimal,
    ) -> GuardrailVerdict {
        self.preflight.validate_at_size(file_ref, width_inches, height_inches).await.verdict
    }

    pub fn capabilities(&self) -> Vec<CapabilityStatus> {
        self.registry.capabilities()
    }
}

fn log_verdict(request_id: Uuid, verdict: &GuardrailVerdict) {
    info!(
        event_name = "pipeline.layer.evaluated",
        request_id = %request_id,
        layer = verdict.layer.as_str(),
        passed = verdict.passed,
        codes = ?verdict.codes(),
        "guardrail layer evaluated"
    );
}

fn finish(result: PipelineResult) -> PipelineResult {
    info!(
        event_name = "pipeline.run.finished",
        request_id = %result.request_id,
        accepted = result.accepted,
        violations = result.violations().len(),
        "pipeline run finished"
    );
    result
}

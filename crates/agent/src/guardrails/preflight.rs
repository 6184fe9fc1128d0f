use std::sync::Arc;

use printguard_core::{
    FileReference, GuardrailLayer, GuardrailVerdict, OrderSpec, ToolError, ToolResult, Violation,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::tools::{ToolCall, ToolRegistry};

pub const INSUFFICIENT_RESOLUTION: &str = "INSUFFICIENT_RESOLUTION";
pub const UNREADABLE_ARTWORK: &str = "UNREADABLE_ARTWORK";
pub const PREFLIGHT_UNAVAILABLE: &str = "PREFLIGHT_UNAVAILABLE";
pub const MISSING_ARTWORK: &str = "MISSING_ARTWORK";

/// Verdict plus the resolution call it made, so the agent can record the
/// call in its transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreflightOutcome {
    pub verdict: GuardrailVerdict,
    pub call: ToolCall,
    pub result: ToolResult,
}

/// Layer 2: artwork checks against production constraints.
pub struct PreflightGuardrail {
    registry: Arc<ToolRegistry>,
    require_artwork: bool,
}

impl PreflightGuardrail {
    pub fn new(registry: Arc<ToolRegistry>, require_artwork: bool) -> Self {
        Self { registry, require_artwork }
    }

    pub async fn validate_artwork(
        &self,
        file_ref: &FileReference,
        spec: &OrderSpec,
    ) -> PreflightOutcome {
        self.validate_at_size(file_ref, spec.width_inches, spec.height_inches).await
    }

    /// Same check for a bare print size, when no full order exists yet.
    pub async fn validate_at_size(
        &self,
        file_ref: &FileReference,
        width_inches: Decimal,
        height_inches: Decimal,
    ) -> PreflightOutcome {
        let call =
            ToolCall::CheckResolution { file_ref: file_ref.clone(), width_inches, height_inches };
        let result = self.registry.execute(&call).await;
        let verdict = verdict_for(&result);
        info!(
            event_name = "guardrail.preflight.evaluated",
            uri = %file_ref.uri,
            passed = verdict.passed,
            violations = verdict.violations.len(),
            "artwork preflight evaluated"
        );

        PreflightOutcome { verdict, call, result }
    }

    /// Verdict for an order with no artwork attached. `None` means the layer is
    /// skipped.
    pub fn without_artwork(&self) -> Option<GuardrailVerdict> {
        self.require_artwork.then(|| {
            GuardrailVerdict::new(
                GuardrailLayer::Preflight,
                vec![Violation::blocking(
                    MISSING_ARTWORK,
                    "this order requires print-ready artwork but none was attached",
                )],
            )
        })
    }
}

/// Maps a resolution tool result onto a preflight verdict. Tool failures become
/// blocking violations; nothing escapes as an error.
pub fn verdict_for(result: &ToolResult) -> GuardrailVerdict {
    let violation = match result {
        ToolResult::Ok(_) => match result.resolution() {
            Some(report) if report.meets_threshold() => None,
            Some(report) => Some(Violation::blocking(
                INSUFFICIENT_RESOLUTION,
                format!(
                    "artwork is {} dpi at the requested size ({}x{} px); {} dpi required",
                    report.actual_dpi, report.pixel_width, report.pixel_height, report.required_dpi
                ),
            )),
            None => Some(Violation::blocking(
                PREFLIGHT_UNAVAILABLE,
                "resolution check returned an unexpected result",
            )),
        },
        ToolResult::Err(error) if error.is_artwork_defect() => {
            Some(Violation::blocking(UNREADABLE_ARTWORK, error.to_string()))
        }
        ToolResult::Err(error @ ToolError::InvalidInput { .. }) => {
            Some(Violation::blocking(UNREADABLE_ARTWORK, error.to_string()))
        }
        ToolResult::Err(error) => Some(Violation::blocking(
            PREFLIGHT_UNAVAILABLE,
            format!("artwork could not be verified: {error}"),
        )),
    };

    GuardrailVerdict::new(GuardrailLayer::Preflight, violation.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use printguard_core::tools::resolution::blank_png;
    use printguard_core::tools::{ImageResolutionTool, InMemoryArtworkStore};
    use printguard_core::{FileReference, OrderSpec, ToolError, ToolResult};
    use rust_decimal::Decimal;

    use super::{
        verdict_for, PreflightGuardrail, INSUFFICIENT_RESOLUTION, MISSING_ARTWORK,
        PREFLIGHT_UNAVAILABLE, UNREADABLE_ARTWORK,
    };
    use crate::tools::ToolRegistry;

    fn postcard() -> OrderSpec {
        OrderSpec {
            paper_stock: "14pt_cardstock".to_string(),
            color: "white".to_string(),
            finish: "gloss".to_string(),
            full_color: true,
            dark_paper: false,
            quantity: 250,
            width_inches: Decimal::new(6, 0),
            height_inches: Decimal::new(4, 0),
            rush_type: None,
        }
    }

    fn guardrail(store: InMemoryArtworkStore) -> PreflightGuardrail {
        let registry = ToolRegistry::new(Duration::from_secs(1))
            .with_resolution(ImageResolutionTool::new(store, Decimal::new(300, 0)));
        PreflightGuardrail::new(Arc::new(registry), false)
    }

    #[tokio::test]
    async fn low_resolution_artwork_is_blocked_with_both_values() {
        let store = InMemoryArtworkStore::default()
            .with_file("low.png", blank_png(900, 600).expect("encode png fixture"));

        let outcome =
            guardrail(store).validate_artwork(&FileReference::new("low.png"), &postcard()).await;

        assert!(!outcome.verdict.passed);
        assert!(outcome.verdict.has_code(INSUFFICIENT_RESOLUTION));
        let message = &outcome.verdict.violations[0].message;
        assert!(message.contains("150"), "message should carry actual dpi: {message}");
        assert!(message.contains("300"), "message should carry required dpi: {message}");
    }

    #[tokio::test]
    async fn artwork_at_threshold_passes() {
        let store = InMemoryArtworkStore::default()
            .with_file("exact.png", blank_png(1800, 1200).expect("encode png fixture"));

        let outcome =
            guardrail(store).validate_artwork(&FileReference::new("exact.png"), &postcard()).await;

        assert!(outcome.verdict.passed);
        assert!(outcome.result.resolution().is_some());
    }

    #[tokio::test]
    async fn corrupt_artwork_is_unreadable() {
        let store = InMemoryArtworkStore::default().with_file("scan.tiff", b"II*\0".to_vec());

        let outcome =
            guardrail(store).validate_artwork(&FileReference::new("scan.tiff"), &postcard()).await;

        assert!(outcome.verdict.has_code(UNREADABLE_ARTWORK));
    }

    #[test]
    fn tool_outage_blocks_without_escaping() {
        let verdict =
            verdict_for(&ToolResult::Err(ToolError::Unavailable {
                tool: "check_resolution".into(),
            }));

        assert!(!verdict.passed);
        assert!(verdict.has_code(PREFLIGHT_UNAVAILABLE));
    }

    #[test]
    fn missing_artwork_only_matters_when_required() {
        let registry = Arc::new(ToolRegistry::new(Duration::from_secs(1)));

        assert!(PreflightGuardrail::new(registry.clone(), false).without_artwork().is_none());
        let verdict = PreflightGuardrail::new(registry, true)
            .without_artwork()
            .expect("required artwork yields a verdict");
        assert!(verdict.has_code(MISSING_ARTWORK));
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::price::Price;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub paper_stock: String,
    pub color: String,
    pub finish: String,
    pub available_sheets: u32,
}

impl InventoryReport {
    pub fn covers(&self, quantity: i64) -> bool {
        quantity > 0 && i64::from(self.available_sheets) >= quantity
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub format: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub actual_dpi: Decimal,
    pub required_dpi: Decimal,
}

impl ResolutionReport {
    pub fn meets_threshold(&self) -> bool {
        self.actual_dpi >= self.required_dpi
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOutput {
    Inventory(InventoryReport),
    Resolution(ResolutionReport),
    Price(Price),
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    #[error("tool `{tool}` timed out after {after_ms}ms")]
    Timeout { tool: String, after_ms: u64 },
    #[error("tool `{tool}` is not registered")]
    Unavailable { tool: String },
    #[error("artwork `{uri}` could not be read: {reason}")]
    UnreadableArtwork { uri: String, reason: String },
    #[error("artwork `{uri}` has an unsupported format: {detail}")]
    UnsupportedFormat { uri: String, detail: String },
    #[error("unknown material: {detail}")]
    UnknownMaterial { detail: String },
    #[error("unknown rush type `{rush_type}`")]
    UnknownRushType { rush_type: String },
    #[error("invalid tool input: {reason}")]
    InvalidInput { reason: String },
    #[error("arithmetic overflow while {detail}")]
    Arithmetic { detail: String },
    #[error("tool `{tool}` returned an unexpected output")]
    UnexpectedOutput { tool: String },
}

impl ToolError {
    /// Failures rooted in the artwork file itself rather than in the tool.
    pub fn is_artwork_defect(&self) -> bool {
        matches!(self, Self::UnreadableArtwork { .. } | Self::UnsupportedFormat { .. })
    }
}

/// Result of one tool invocation as recorded in a transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolResult {
    Ok(ToolOutput),
    Err(ToolError),
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn price(&self) -> Option<&Price> {
        match self {
            Self::Ok(ToolOutput::Price(price)) => Some(price),
            _ => None,
        }
    }

    pub fn inventory(&self) -> Option<&InventoryReport> {
        match self {
            Self::Ok(ToolOutput::Inventory(report)) => Some(report),
            _ => None,
        }
    }

    pub fn resolution(&self) -> Option<&ResolutionReport> {
        match self {
            Self::Ok(ToolOutput::Resolution(report)) => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            Self::Err(error) => Some(error),
            Self::Ok(_) => None,
        }
    }
}

impl From<Result<ToolOutput, ToolError>> for ToolResult {
    fn from(value: Result<ToolOutput, ToolError>) -> Self {
        match value {
            Ok(output) => Self::Ok(output),
            Err(error) => Self::Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InventoryReport, ToolError, ToolOutput, ToolResult};

    #[test]
    fn tool_result_serializes_with_status_tag() {
        let result =
            ToolResult::Err(ToolError::Timeout { tool: "pricing".to_string(), after_ms: 50 });
        let json = serde_json::to_value(&result).expect("tool result serializes");

        assert_eq!(json["status"], "err");
        assert_eq!(json["value"]["kind"], "timeout");
        assert_eq!(json["value"]["after_ms"], 50);
    }

    #[test]
    fn accessors_only_match_their_output_kind() {
        let result = ToolResult::Ok(ToolOutput::Inventory(InventoryReport {
            paper_stock: "80lb_text".to_string(),
            color: "white".to_string(),
            finish: "gloss".to_string(),
            available_sheets: 40,
        }));

        assert!(result.is_ok());
        assert!(result.price().is_none());
        assert!(result.inventory().is_some_and(|report| report.covers(40)));
        assert!(result.inventory().is_some_and(|report| !report.covers(41)));
    }

    #[test]
    fn artwork_defects_are_distinguished_from_tool_outages() {
        let unreadable =
            ToolError::UnreadableArtwork { uri: "a.png".to_string(), reason: "eof".to_string() };
        let outage = ToolError::Unavailable { tool: "resolution".to_string() };

        assert!(unreadable.is_artwork_defect());
        assert!(!outage.is_artwork_defect());
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Validated order parameters for one pipeline run.
///
/// Built once from caller input and never mutated afterwards. Values here are
/// well-formed but not necessarily feasible: a zero quantity or an unknown
/// material combination is reported by the spec guardrail, not rejected here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub paper_stock: String,
    pub color: String,
    pub finish: String,
    pub full_color: bool,
    pub dark_paper: bool,
    pub quantity: i64,
    pub width_inches: Decimal,
    pub height_inches: Decimal,
    pub rush_type: Option<String>,
}

impl OrderSpec {
    pub fn materials(&self) -> MaterialSpec {
        MaterialSpec {
            paper_stock: self.paper_stock.clone(),
            color: self.color.clone(),
            finish: self.finish.clone(),
            full_color: self.full_color,
            dark_paper: self.dark_paper,
        }
    }

    pub fn price_request(&self) -> PriceRequest {
        PriceRequest {
            paper_stock: self.paper_stock.clone(),
            quantity: self.quantity,
            width_inches: self.width_inches,
            height_inches: self.height_inches,
            full_color: self.full_color,
            rush_type: self.rush_type.clone(),
        }
    }
}

/// The material-only slice of an order used by the direct spec check path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub paper_stock: String,
    pub color: String,
    pub finish: String,
    pub full_color: bool,
    pub dark_paper: bool,
}

/// Input contract of the pricing tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRequest {
    pub paper_stock: String,
    pub quantity: i64,
    pub width_inches: Decimal,
    pub height_inches: Decimal,
    pub full_color: bool,
    pub rush_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl FileReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), media_type: None }
    }
}

/// Caller-supplied order fields, every one optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSpecInput {
    pub paper_stock: Option<String>,
    pub color: Option<String>,
    pub finish: Option<String>,
    pub full_color: Option<bool>,
    pub dark_paper: Option<bool>,
    pub quantity: Option<i64>,
    pub width_inches: Option<Decimal>,
    pub height_inches: Option<Decimal>,
    pub rush_type: Option<String>,
}

impl OrderSpecInput {
    /// Fills every absent field from `fallback`; fields already present win.
    pub fn or(self, fallback: OrderSpecInput) -> Self {
        Self {
            paper_stock: self.paper_stock.or(fallback.paper_stock),
            color: self.color.or(fallback.color),
            finish: self.finish.or(fallback.finish),
            full_color: self.full_color.or(fallback.full_color),
            dark_paper: self.dark_paper.or(fallback.dark_paper),
            quantity: self.quantity.or(fallback.quantity),
            width_inches: self.width_inches.or(fallback.width_inches),
            height_inches: self.height_inches.or(fallback.height_inches),
            rush_type: self.rush_type.or(fallback.rush_type),
        }
    }

    /// Builds the immutable spec. `dark_paper` may be left absent, in which case
    /// `dark_default` supplies it.
    pub fn into_spec(
        self,
        dark_default: impl FnOnce(&str) -> bool,
    ) -> Result<OrderSpec, DomainError> {
        let mut missing = Vec::new();
        let paper_stock = required_text(self.paper_stock, "paper_stock", &mut missing);
        let color = required_text(self.color, "color", &mut missing);
        let finish = required_text(self.finish, "finish", &mut missing);
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        if self.width_inches.is_none() {
            missing.push("width_inches");
        }
        if self.height_inches.is_none() {
            missing.push("height_inches");
        }

        let (
            Some(paper_stock),
            Some(color),
            Some(finish),
            Some(quantity),
            Some(width_inches),
            Some(height_inches),
        ) = (paper_stock, color, finish, self.quantity, self.width_inches, self.height_inches)
        else {
            return Err(DomainError::MissingFields(
                missing.into_iter().map(str::to_string).collect(),
            ));
        };

        let dark_paper = self.dark_paper.unwrap_or_else(|| dark_default(&color));
        let rush_type = self
            .rush_type
            .map(|value| normalize_token(&value))
            .filter(|value| !value.is_empty() && value != "standard" && value != "none");

        Ok(OrderSpec {
            paper_stock,
            color,
            finish,
            full_color: self.full_color.unwrap_or(false),
            dark_paper,
            quantity,
            width_inches,
            height_inches,
            rush_type,
        })
    }
}

fn required_text(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    let normalized = value.map(|value| normalize_token(&value)).filter(|value| !value.is_empty());
    if normalized.is_none() {
        missing.push(field);
    }
    normalized
}

/// Lowercases and collapses separators so `"100lb Cardstock"` and
/// `"100lb_cardstock"` name the same material.
pub fn normalize_token(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

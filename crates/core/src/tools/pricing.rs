use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::catalog::MaterialCatalog;
use crate::domain::order::{normalize_token, PriceRequest};
use crate::domain::price::{to_cents, Price, PriceStep};
use crate::domain::tool::ToolError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RushTier {
    Hours48,
    Hours24,
    SameDay,
}

impl RushTier {
    pub const KNOWN: &'static [&'static str] = &["rush_48h", "rush_24h", "same_day"];

    /// `None` means standard turnaround. Unknown names are an error.
    pub fn parse(value: Option<&str>) -> Result<Option<Self>, ToolError> {
        let Some(raw) = value else {
            return Ok(None);
        };
        match normalize_token(raw).as_str() {
            "" | "standard" | "none" => Ok(None),
            "rush_48h" => Ok(Some(Self::Hours48)),
            "rush_24h" => Ok(Some(Self::Hours24)),
            "same_day" => Ok(Some(Self::SameDay)),
            _ => Err(ToolError::UnknownRushType { rush_type: raw.to_string() }),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Hours48 => "rush_48h",
            Self::Hours24 => "rush_24h",
            Self::SameDay => "same_day",
        }
    }

    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Hours48 => Decimal::new(125, 2),
            Self::Hours24 => Decimal::new(15, 1),
            Self::SameDay => Decimal::TWO,
        }
    }
}

#[async_trait]
pub trait PricingTool: Send + Sync {
    async fn calculate_price(&self, request: &PriceRequest) -> Result<Price, ToolError>;
}

pub struct DeterministicPricingTool {
    catalog: Arc<MaterialCatalog>,
    currency: String,
}

impl DeterministicPricingTool {
    pub fn new(catalog: Arc<MaterialCatalog>, currency: impl Into<String>) -> Self {
        Self { catalog, currency: currency.into() }
    }
}

#[async_trait]
impl PricingTool for DeterministicPricingTool {
    async fn calculate_price(&self, request: &PriceRequest) -> Result<Price, ToolError> {
        price_order(&self.catalog, request, &self.currency)
    }
}

const SETUP_FEE_CENTS: i64 = 1_500;

fn full_color_factor() -> Decimal {
    Decimal::new(135, 2)
}

fn quantity_discount_rate(quantity: i64) -> Decimal {
    match quantity {
        q if q >= 5_000 => Decimal::new(20, 2),
        q if q >= 1_000 => Decimal::new(15, 2),
        q if q >= 500 => Decimal::new(10, 2),
        _ => Decimal::ZERO,
    }
}

/// Prices an order in fixed-point arithmetic. Identical requests always yield
/// identical prices.
pub fn price_order(
    catalog: &MaterialCatalog,
    request: &PriceRequest,
    currency: &str,
) -> Result<Price, ToolError> {
    if request.quantity <= 0 {
        return Err(ToolError::InvalidInput { reason: "quantity must be positive".to_string() });
    }
    if request.width_inches <= Decimal::ZERO || request.height_inches <= Decimal::ZERO {
        return Err(ToolError::InvalidInput {
            reason: "print dimensions must be positive".to_string(),
        });
    }

    let stock = catalog.stock(&request.paper_stock).ok_or_else(|| ToolError::UnknownMaterial {
        detail: format!("paper stock `{}` is not priced", request.paper_stock),
    })?;
    let rush = RushTier::parse(request.rush_type.as_deref())?;

    let area = checked(request.width_inches.checked_mul(request.height_inches), "computing area")?;
    let mut unit = checked(area.checked_mul(stock.rate_per_sq_inch), "applying stock rate")?;
    if request.full_color {
        unit = checked(unit.checked_mul(full_color_factor()), "applying full-color ink")?;
    }

    let quantity = Decimal::from(request.quantity);
    let subtotal = to_cents(checked(unit.checked_mul(quantity), "extending quantity")?);
    let discount_rate = quantity_discount_rate(request.quantity);
    let quantity_discount =
        to_cents(checked(subtotal.checked_mul(discount_rate), "applying discount")?);
    let setup_fee = Decimal::new(SETUP_FEE_CENTS, 2);
    let base = checked(
        subtotal.checked_sub(quantity_discount).and_then(|value| value.checked_add(setup_fee)),
        "summing base price",
    )?;

    let rush_surcharge = match rush {
        Some(tier) => to_cents(checked(
            base.checked_mul(tier.multiplier() - Decimal::ONE),
            "applying rush surcharge",
        )?),
        None => Decimal::ZERO,
    };
    let total = to_cents(checked(base.checked_add(rush_surcharge), "summing total")?);

    let mut steps = vec![
        PriceStep {
            stage: "subtotal".to_string(),
            detail: format!(
                "{} sq in x {} per sq in{} x {} pcs",
                area.normalize(),
                stock.rate_per_sq_inch.normalize(),
                if request.full_color { " x 1.35 full color" } else { "" },
                request.quantity
            ),
            amount: subtotal,
        },
        PriceStep {
            stage: "quantity_discount".to_string(),
            detail: format!(
                "{}% volume discount",
                (discount_rate * Decimal::ONE_HUNDRED).normalize()
            ),
            amount: -quantity_discount,
        },
        PriceStep {
            stage: "setup_fee".to_string(),
            detail: "flat press setup".to_string(),
            amount: setup_fee,
        },
    ];
    if let Some(tier) = rush {
        steps.push(PriceStep {
            stage: "rush_surcharge".to_string(),
            detail: format!("{} x {}", tier.key(), tier.multiplier().normalize()),
            amount: rush_surcharge,
        });
    }

    Ok(Price {
        currency: currency.to_string(),
        unit_price: to_cents(unit),
        subtotal,
        quantity_discount,
        setup_fee,
        rush_surcharge,
        total,
        steps,
    })
}

fn checked(value: Option<Decimal>, detail: &str) -> Result<Decimal, ToolError> {
    value.ok_or_else(|| ToolError::Arithmetic { detail: detail.to_string() })
}

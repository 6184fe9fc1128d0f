use std::sync::Arc;

use printguard_core::config::GuardrailConfig;
use printguard_core::tools::RushTier;
use printguard_core::{
    GuardrailLayer, GuardrailVerdict, MaterialCatalog, MaterialSpec, OrderSpec, Violation,
};
use rust_decimal::Decimal;

pub const FULL_COLOR_ON_DARK_STOCK: &str = "FULL_COLOR_ON_DARK_STOCK";
pub const INVALID_DIMENSIONS: &str = "INVALID_DIMENSIONS";
pub const UNKNOWN_MATERIAL_COMBINATION: &str = "UNKNOWN_MATERIAL_COMBINATION";
pub const EXCEEDS_MAX_PRINT_SIZE: &str = "EXCEEDS_MAX_PRINT_SIZE";
pub const UNKNOWN_RUSH_TYPE: &str = "UNKNOWN_RUSH_TYPE";
pub const SMALL_QUANTITY: &str = "SMALL_QUANTITY";

/// Layer 1: production feasibility of an order before any tool runs.
///
/// A pure function of the spec, the catalog and the configured limits; it never
/// performs I/O.
#[derive(Clone, Debug)]
pub struct SpecCheckGuardrail {
    catalog: Arc<MaterialCatalog>,
    small_quantity_threshold: i64,
    max_print_inches: Decimal,
}

impl SpecCheckGuardrail {
    pub fn new(catalog: Arc<MaterialCatalog>, config: &GuardrailConfig) -> Self {
        Self {
            catalog,
            small_quantity_threshold: config.small_quantity_threshold,
            max_print_inches: config.max_print_inches,
        }
    }

    pub fn validate_order_spec(&self, spec: &OrderSpec) -> GuardrailVerdict {
        let mut violations = self.material_violations(&spec.materials());

        if spec.quantity <= 0 {
            violations.push(Violation::blocking(
                INVALID_DIMENSIONS,
                format!("quantity must be positive, got {}", spec.quantity),
            ));
        }
        if spec.width_inches <= Decimal::ZERO || spec.height_inches <= Decimal::ZERO {
            violations.push(Violation::blocking(
                INVALID_DIMENSIONS,
                format!(
                    "print size must be positive, got {} x {} in",
                    spec.width_inches, spec.height_inches
                ),
            ));
        } else if spec.width_inches > self.max_print_inches
            || spec.height_inches > self.max_print_inches
        {
            violations.push(Violation::blocking(
                EXCEEDS_MAX_PRINT_SIZE,
                format!(
                    "{} x {} in exceeds the {} in press limit",
                    spec.width_inches, spec.height_inches, self.max_print_inches
                ),
            ));
        }

        if RushTier::parse(spec.rush_type.as_deref()).is_err() {
            violations.push(Violation::blocking(
                UNKNOWN_RUSH_TYPE,
                format!(
                    "rush type `{}` is not offered (expected one of {})",
                    spec.rush_type.as_deref().unwrap_or_default(),
                    RushTier::KNOWN.join(", ")
                ),
            ));
        }

        if spec.quantity > 0 && spec.quantity < self.small_quantity_threshold {
            violations.push(Violation::warning(
                SMALL_QUANTITY,
                format!(
                    "{} pieces is below the {}-piece small-order threshold; \
                     setup cost dominates the price",
                    spec.quantity, self.small_quantity_threshold
                ),
            ));
        }

        GuardrailVerdict::new(GuardrailLayer::Spec, violations)
    }

    /// Material rules only, for callers that have no quantity or size yet.
    pub fn validate_material_spec(&self, material: &MaterialSpec) -> GuardrailVerdict {
        GuardrailVerdict::new(GuardrailLayer::Spec, self.material_violations(material))
    }

    fn material_violations(&self, material: &MaterialSpec) -> Vec<Violation> {
        let mut violations = Vec::new();

        if material.full_color && material.dark_paper && self.catalog.is_dark(&material.color) {
            violations.push(Violation::blocking(
                FULL_COLOR_ON_DARK_STOCK,
                format!(
                    "full-color ink does not render on dark `{}` stock without a white underprint",
                    material.color
                ),
            ));
        }

        if let Some(reason) = self.unknown_material_reason(material) {
            violations.push(Violation::blocking(UNKNOWN_MATERIAL_COMBINATION, reason));
        }

        violations
    }

    fn unknown_material_reason(&self, material: &MaterialSpec) -> Option<String> {
        if self.catalog.stock(&material.paper_stock).is_none() {
            return Some(format!("paper stock `{}` is not in the catalog", material.paper_stock));
        }
        if self.catalog.color_family(&material.color).is_none() {
            return Some(format!("color `{}` is not in the catalog", material.color));
        }
        if !self.catalog.is_known_finish(&material.finish) {
            return Some(format!("finish `{}` is not in the catalog", material.finish));
        }
        if self.catalog.entry(&material.paper_stock, &material.color, &material.finish).is_none() {
            return Some(format!(
                "`{}` is not offered in {} with a {} finish",
                material.paper_stock, material.color, material.finish
            ));
        }
        None
    }
}

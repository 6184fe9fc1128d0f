use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::normalize_token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFamily {
    Light,
    Natural,
    Dark,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperStock {
    pub id: String,
    pub display_name: String,
    /// Base rate per square inch of printed piece, single-color ink.
    pub rate_per_sq_inch: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperColor {
    pub name: String,
    pub family: ColorFamily,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub paper_stock: String,
    pub color: String,
    pub finish: String,
    pub available_sheets: u32,
}

/// Stock, color and finish combinations the shop can actually produce.
///
/// The catalog is read-only once built; the inventory tool answers from it and
/// the spec guardrail references it for membership checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCatalog {
    stocks: Vec<PaperStock>,
    colors: Vec<PaperColor>,
    finishes: Vec<String>,
    entries: Vec<MaterialEntry>,
}

impl MaterialCatalog {
    pub fn new(
        stocks: Vec<PaperStock>,
        colors: Vec<PaperColor>,
        finishes: Vec<String>,
        entries: Vec<MaterialEntry>,
    ) -> Self {
        Self { stocks, colors, finishes, entries }
    }

    pub fn stock(&self, id: &str) -> Option<&PaperStock> {
        let id = normalize_token(id);
        self.stocks.iter().find(|stock| stock.id == id)
    }

    pub fn stocks(&self) -> &[PaperStock] {
        &self.stocks
    }

    pub fn colors(&self) -> &[PaperColor] {
        &self.colors
    }

    pub fn finishes(&self) -> &[String] {
        &self.finishes
    }

    pub fn color_family(&self, color: &str) -> Option<ColorFamily> {
        let color = normalize_token(color);
        self.colors.iter().find(|entry| entry.name == color).map(|entry| entry.family)
    }

    pub fn is_dark(&self, color: &str) -> bool {
        self.color_family(color) == Some(ColorFamily::Dark)
    }

    pub fn is_known_finish(&self, finish: &str) -> bool {
        let finish = normalize_token(finish);
        self.finishes.iter().any(|known| *known == finish)
    }

    pub fn entry(&self, paper_stock: &str, color: &str, finish: &str) -> Option<&MaterialEntry> {
        let (paper_stock, color, finish) =
            (normalize_token(paper_stock), normalize_token(color), normalize_token(finish));
        self.entries.iter().find(|entry| {
            entry.paper_stock == paper_stock && entry.color == color && entry.finish == finish
        })
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        let stocks = [
            ("100lb_cardstock", "100lb Cardstock", 120),
            ("14pt_cardstock", "14pt Cardstock", 105),
            ("80lb_text", "80lb Text", 60),
            ("kraft_cardstock", "Kraft Cardstock", 110),
            ("vinyl", "Adhesive Vinyl", 250),
        ]
        .into_iter()
        .map(|(id, display_name, rate)| PaperStock {
            id: id.to_string(),
            display_name: display_name.to_string(),
            rate_per_sq_inch: Decimal::new(rate, 4),
        })
        .collect();

        let colors = [
            ("white", ColorFamily::Light),
            ("ivory", ColorFamily::Light),
            ("kraft", ColorFamily::Natural),
            ("black", ColorFamily::Dark),
            ("navy", ColorFamily::Dark),
            ("charcoal", ColorFamily::Dark),
            ("forest_green", ColorFamily::Dark),
        ]
        .into_iter()
        .map(|(name, family)| PaperColor { name: name.to_string(), family })
        .collect();

        let finishes = ["matte", "gloss", "uncoated", "soft_touch"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let entries = [
            ("100lb_cardstock", "white", "matte", 12_000),
            ("100lb_cardstock", "white", "gloss", 9_000),
            ("100lb_cardstock", "white", "soft_touch", 3_000),
            ("100lb_cardstock", "ivory", "matte", 4_000),
            ("100lb_cardstock", "black", "matte", 2_500),
            ("100lb_cardstock", "navy", "matte", 1_500),
            ("100lb_cardstock", "charcoal", "uncoated", 800),
            ("14pt_cardstock", "white", "matte", 20_000),
            ("14pt_cardstock", "white", "gloss", 18_000),
            ("14pt_cardstock", "white", "uncoated", 6_000),
            ("14pt_cardstock", "black", "soft_touch", 1_000),
            ("80lb_text", "white", "gloss", 30_000),
            ("80lb_text", "white", "matte", 25_000),
            ("80lb_text", "ivory", "uncoated", 7_000),
            ("kraft_cardstock", "kraft", "uncoated", 5_000),
            ("vinyl", "white", "gloss", 2_000),
            ("vinyl", "white", "matte", 1_200),
        ]
        .into_iter()
        .map(|(paper_stock, color, finish, available_sheets)| MaterialEntry {
            paper_stock: paper_stock.to_string(),
            color: color.to_string(),
            finish: finish.to_string(),
            available_sheets,
        })
        .collect();

        Self::new(stocks, colors, finishes, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorFamily, MaterialCatalog};

    #[test]
    fn lookups_ignore_case_and_separators() {
        let catalog = MaterialCatalog::default();

        assert!(catalog.stock("100lb Cardstock").is_some());
        assert!(catalog.entry("14PT-cardstock", "Black", "soft touch").is_some());
        assert_eq!(catalog.color_family("Forest Green"), Some(ColorFamily::Dark));
    }

    #[test]
    fn unknown_combinations_are_absent() {
        let catalog = MaterialCatalog::default();

        assert!(catalog.entry("vinyl", "black", "gloss").is_none());
        assert!(catalog.color_family("magenta").is_none());
        assert!(!catalog.is_dark("ivory"));
        assert!(!catalog.is_known_finish("linen"));
    }
}

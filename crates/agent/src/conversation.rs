use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use printguard_core::{MaterialCatalog, OrderSpecInput};
use regex::Regex;
use rust_decimal::Decimal;

/// Pulls order fields out of a free-text request.
///
/// Extraction only proposes values. Anything the caller sent explicitly wins
/// (see [`OrderSpecInput::or`]), and nothing here judges feasibility.
#[derive(Clone, Debug)]
pub struct OrderIntentExtractor {
    catalog: Arc<MaterialCatalog>,
}

impl OrderIntentExtractor {
    pub fn new(catalog: Arc<MaterialCatalog>) -> Self {
        Self { catalog }
    }

    pub fn extract(&self, text: &str) -> OrderSpecInput {
        let normalized_text = normalize_text(text);

        let (dimensions, remainder) = extract_dimensions(&normalized_text);
        let quantity = extract_quantity(&remainder);
        let (paper_stock, remainder) = self.extract_stock(&remainder);
        let color = self.extract_color(&remainder);
        let finish = self.extract_finish(&remainder);

        OrderSpecInput {
            paper_stock,
            color,
            finish,
            full_color: extract_full_color(&normalized_text),
            dark_paper: None,
            quantity,
            width_inches: dimensions.map(|(width, _)| width),
            height_inches: dimensions.map(|(_, height)| height),
            rush_type: extract_rush_type(&normalized_text).map(str::to_string),
        }
    }

    /// Longest catalog name first, so `kraft cardstock` resolves to the stock
    /// and is then removed before colors are matched.
    fn extract_stock(&self, text: &str) -> (Option<String>, String) {
        let mut candidates = self
            .catalog
            .stocks()
            .iter()
            .flat_map(|stock| {
                [stock.id.replace('_', " "), normalize_text(&stock.display_name)]
                    .into_iter()
                    .map(move |phrase| (phrase, stock.id.clone()))
            })
            .collect::<Vec<_>>();
        candidates.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.len()));

        for (phrase, id) in candidates {
            if let Some(found) = word_pattern(&phrase).and_then(|pattern| pattern.find(text)) {
                let mut remainder = text.to_string();
                remainder.replace_range(found.range(), " ");
                return (Some(id), remainder);
            }
        }
        (None, text.to_string())
    }

    fn extract_color(&self, text: &str) -> Option<String> {
        self.catalog
            .colors()
            .iter()
            .find(|color| matches_phrase(&color.name, text))
            .map(|color| color.name.clone())
    }

    fn extract_finish(&self, text: &str) -> Option<String> {
        self.catalog
            .finishes()
            .iter()
            .find(|finish| matches_phrase(finish, text))
            .cloned()
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase().replace(['_', '-'], " ")
}

fn word_pattern(phrase: &str) -> Option<Regex> {
    let escaped = phrase.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+");
    Regex::new(&format!(r"\b{escaped}\b")).ok()
}

fn matches_phrase(catalog_name: &str, text: &str) -> bool {
    word_pattern(&catalog_name.replace('_', " ")).is_some_and(|pattern| pattern.is_match(text))
}

fn dimension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(\d+(?:\.\d+)?)\s*(?:"|in(?:ch(?:es)?)?\b)?\s*(?:x|×|by)\s*(\d+(?:\.\d+)?)\s*(?:"|in(?:ch(?:es)?)?\b)?"#,
        )
        .unwrap_or_else(|error| panic!("dimension pattern is a valid regex: {error}"))
    })
}

fn quantity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:\b(?:qty|quantity)\s*(?:of|:)?\s*(\d[\d,]*)\b)|(?:\b(\d[\d,]*)\s+(?:[a-z]+\s+){0,3}?(?:cards|prints|pieces|pcs|copies|flyers|postcards|stickers|labels|sheets|invitations|units)\b)",
        )
        .unwrap_or_else(|error| panic!("quantity pattern is a valid regex: {error}"))
    })
}

/// Returns `(width, height)` and the text with that span blanked out, so the
/// dimension figures are not mistaken for a quantity.
fn extract_dimensions(text: &str) -> (Option<(Decimal, Decimal)>, String) {
    let Some(captures) = dimension_pattern().captures(text) else {
        return (None, text.to_string());
    };
    let parsed = captures
        .get(1)
        .zip(captures.get(2))
        .and_then(|(width, height)| {
            Decimal::from_str(width.as_str()).ok().zip(Decimal::from_str(height.as_str()).ok())
        });

    let mut remainder = text.to_string();
    if let Some(span) = captures.get(0) {
        remainder.replace_range(span.range(), " ");
    }
    (parsed, remainder)
}

fn extract_quantity(text: &str) -> Option<i64> {
    quantity_pattern().captures_iter(text).find_map(|captures| {
        let digits = captures.get(1).or_else(|| captures.get(2))?.as_str().replace(',', "");
        digits.parse::<i64>().ok()
    })
}

fn extract_full_color(text: &str) -> Option<bool> {
    let single = [
        "black and white",
        "b&w",
        "grayscale",
        "greyscale",
        "one color",
        "1 color",
        "single color",
    ];
    let full = ["full color", "full colour", "cmyk", "4 color", "four color", "4/4", "4/0"];

    if single.iter().any(|phrase| text.contains(phrase)) {
        Some(false)
    } else if full.iter().any(|phrase| text.contains(phrase)) {
        Some(true)
    } else {
        None
    }
}

fn extract_rush_type(text: &str) -> Option<&'static str> {
    if text.contains("same day") {
        Some("same_day")
    } else if ["24h", "24 hour", "24hr", "next day", "overnight", "tomorrow"]
        .iter()
        .any(|hint| text.contains(hint))
    {
        Some("rush_24h")
    } else if ["48h", "48 hour", "48hr", "two day", "2 day", "rush"]
        .iter()
        .any(|hint| text.contains(hint))
    {
        Some("rush_48h")
    } else {
        None
    }
}

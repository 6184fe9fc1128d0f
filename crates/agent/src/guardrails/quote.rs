use std::str::FromStr;
use std::sync::OnceLock;

use printguard_core::{GuardrailLayer, GuardrailVerdict, Price, Violation};
use regex::Regex;
use rust_decimal::Decimal;

use crate::transcript::AgentTranscript;

pub const UNGROUNDED_QUOTE: &str = "UNGROUNDED_QUOTE";
pub const QUOTE_MISMATCH: &str = "QUOTE_MISMATCH";
pub const MISSING_QUOTE_IN_RESPONSE: &str = "MISSING_QUOTE_IN_RESPONSE";

/// A currency-marked amount found in a response. `amount` is `None` when the
/// literal does not fit a `Decimal`; such a mention can never be grounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceMention {
    pub raw: String,
    pub amount: Option<Decimal>,
}

/// Layer 3: the response must state the total of the last successful pricing
/// call in the same transcript. Breakdown figures are accepted only next to
/// that total.
#[derive(Clone, Debug)]
pub struct QuoteGuardrail {
    tolerance: Decimal,
}

impl QuoteGuardrail {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    pub fn validate_response(&self, draft: &str, transcript: &AgentTranscript) -> GuardrailVerdict {
        let mentions = extract_price_mentions(draft);
        let authoritative = transcript.last_successful_price();

        let violations = match (authoritative, mentions.is_empty()) {
            (None, true) => Vec::new(),
            (None, false) => vec![Violation::blocking(
                UNGROUNDED_QUOTE,
                format!(
                    "response states {} but no successful pricing call backs it",
                    join_raw(&mentions)
                ),
            )],
            (Some(price), true) => vec![Violation::warning(
                MISSING_QUOTE_IN_RESPONSE,
                format!(
                    "pricing returned {} {} but the response states no price",
                    price.total, price.currency
                ),
            )],
            (Some(price), false) => self.mismatches(&mentions, price),
        };

        GuardrailVerdict::new(GuardrailLayer::Quote, violations)
    }

    fn mismatches(&self, mentions: &[PriceMention], price: &Price) -> Vec<Violation> {
        let within = |amount: Option<Decimal>, target: Decimal| {
            amount.is_some_and(|amount| (amount - target).abs() <= self.tolerance)
        };
        let quotable = price.quotable_amounts();
        let mut seen: Vec<&str> = Vec::new();

        let mut violations: Vec<Violation> = mentions
            .iter()
            .filter(|mention| !quotable.iter().any(|amount| within(mention.amount, *amount)))
            .filter(|mention| {
                let key = mention.raw.as_str();
                let fresh = !seen.contains(&key);
                if fresh {
                    seen.push(key);
                }
                fresh
            })
            .map(|mention| {
                Violation::blocking(
                    QUOTE_MISMATCH,
                    format!(
                        "response states {} but the authoritative total is {} {}",
                        mention.raw, price.total, price.currency
                    ),
                )
            })
            .collect();

        let states_total = mentions.iter().any(|mention| within(mention.amount, price.total));
        if violations.is_empty() && !states_total {
            violations.push(Violation::blocking(
                QUOTE_MISMATCH,
                format!(
                    "response states {} but never the authoritative total {} {}",
                    join_raw(mentions),
                    price.total,
                    price.currency
                ),
            ));
        }

        violations
    }
}

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?ix)
            (?:[$€£]|\b(?:usd|eur|gbp|cad|aud)\b)\s?
                (?P<prefixed>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)
            |
            (?P<suffixed>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s?
                \b(?:usd|eur|gbp|cad|aud|dollars?)\b
            ",
        )
        .unwrap_or_else(|error| panic!("price pattern is a valid regex: {error}"))
    })
}

/// Finds currency-marked numeric literals such as `$125.50`, `$1,250`,
/// `USD 40` or `40.00 dollars`. Bare numbers are ignored.
pub fn extract_price_mentions(text: &str) -> Vec<PriceMention> {
    price_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let number = captures.name("prefixed").or_else(|| captures.name("suffixed"))?;
            let amount = Decimal::from_str(&number.as_str().replace(',', "")).ok();
            let raw = captures.get(0)?.as_str().trim().to_string();
            Some(PriceMention { raw, amount })
        })
        .collect()
}

fn join_raw(mentions: &[PriceMention]) -> String {
    mentions.iter().map(|mention| mention.raw.as_str()).collect::<Vec<_>>().join(", ")
}

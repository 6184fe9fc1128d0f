//! The three guardrail layers. Each returns a [`GuardrailVerdict`] and never
//! an error; violations are data.
//!
//! [`GuardrailVerdict`]: printguard_core::GuardrailVerdict

pub mod preflight;
pub mod quote;
pub mod spec_check;

pub use preflight::{PreflightGuardrail, PreflightOutcome};
pub use quote::{extract_price_mentions, PriceMention, QuoteGuardrail};
pub use spec_check::SpecCheckGuardrail;

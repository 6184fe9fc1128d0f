use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardrailLayer {
    Spec,
    Preflight,
    Quote,
}

impl GuardrailLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Preflight => "preflight",
            Self::Quote => "quote",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Blocking,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn blocking(code: &str, message: impl Into<String>) -> Self {
        Self { code: code.to_string(), message: message.into(), severity: Severity::Blocking }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self { code: code.to_string(), message: message.into(), severity: Severity::Warning }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Outcome of one guardrail layer.
///
/// `passed` is derived from the violations at construction, so a verdict with
/// a blocking violation can never report success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub layer: GuardrailLayer,
}

impl GuardrailVerdict {
    pub fn new(layer: GuardrailLayer, violations: Vec<Violation>) -> Self {
        let passed = !violations.iter().any(Violation::is_blocking);
        Self { passed, violations, layer }
    }

    pub fn pass(layer: GuardrailLayer) -> Self {
        Self::new(layer, Vec::new())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.violations.iter().any(|violation| violation.code == code)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|violation| violation.is_blocking())
    }

    pub fn codes(&self) -> Vec<&str> {
        self.violations.iter().map(|violation| violation.code.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailLayer, GuardrailVerdict, Violation};

    #[test]
    fn warnings_alone_still_pass() {
        let verdict = GuardrailVerdict::new(
            GuardrailLayer::Spec,
            vec![Violation::warning("SMALL_QUANTITY", "only 5 pieces")],
        );

        assert!(verdict.passed);
        assert_eq!(verdict.blocking().count(), 0);
    }

    #[test]
    fn any_blocking_violation_fails() {
        let verdict = GuardrailVerdict::new(
            GuardrailLayer::Quote,
            vec![
                Violation::warning("MISSING_QUOTE_IN_RESPONSE", "no price stated"),
                Violation::blocking("QUOTE_MISMATCH", "stated $1.00, expected $2.00"),
            ],
        );

        assert!(!verdict.passed);
        assert!(verdict.has_code("QUOTE_MISMATCH"));
        assert_eq!(verdict.codes(), vec!["MISSING_QUOTE_IN_RESPONSE", "QUOTE_MISMATCH"]);
    }

    #[test]
    fn serializes_enums_in_screaming_case() {
        let verdict = GuardrailVerdict::new(
            GuardrailLayer::Preflight,
            vec![Violation::blocking("UNREADABLE_ARTWORK", "corrupt file")],
        );
        let json = serde_json::to_value(&verdict).expect("verdict serializes");

        assert_eq!(json["layer"], "PREFLIGHT");
        assert_eq!(json["violations"][0]["severity"], "BLOCKING");
        assert_eq!(json["passed"], false);
    }
}

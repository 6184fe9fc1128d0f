use printguard_core::{Price, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why a transcript stopped without (or instead of) a draft response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalReason {
    ReasoningExhausted,
    ToolFailure,
    PreflightBlocked,
    PlannerFailure,
    Cancelled,
}

impl TerminalReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReasoningExhausted => "REASONING_EXHAUSTED",
            Self::ToolFailure => "TOOL_FAILURE",
            Self::PreflightBlocked => "PREFLIGHT_BLOCKED",
            Self::PlannerFailure => "PLANNER_FAILURE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub index: usize,
    pub tool_called: Option<String>,
    pub tool_input: Value,
    pub tool_result: Option<ToolResult>,
    pub draft_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AgentTurn {
    pub fn tool(name: &str, input: Value, result: ToolResult) -> Self {
        Self {
            index: 0,
            tool_called: Some(name.to_string()),
            tool_input: input,
            tool_result: Some(result),
            draft_response: None,
            terminal: None,
            detail: None,
        }
    }

    pub fn draft(text: impl Into<String>) -> Self {
        Self {
            index: 0,
            tool_called: None,
            tool_input: Value::Object(Map::new()),
            tool_result: None,
            draft_response: Some(text.into()),
            terminal: None,
            detail: None,
        }
    }

    pub fn terminal(reason: TerminalReason, detail: impl Into<String>) -> Self {
        Self {
            index: 0,
            tool_called: None,
            tool_input: Value::Object(Map::new()),
            tool_result: None,
            draft_response: None,
            terminal: Some(reason),
            detail: Some(detail.into()),
        }
    }

    pub fn with_terminal(mut self, reason: TerminalReason, detail: impl Into<String>) -> Self {
        self.terminal = Some(reason);
        self.detail = Some(detail.into());
        self
    }

    pub fn with_call(mut self, name: &str, input: Value) -> Self {
        self.tool_called = Some(name.to_string());
        self.tool_input = input;
        self
    }

    pub fn failed(&self) -> bool {
        matches!(self.tool_result, Some(ToolResult::Err(_)))
    }
}

/// Ordered record of one request's reasoning turns. Indices are assigned on
/// push and always match the position in the transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTranscript {
    turns: Vec<AgentTurn>,
}

impl AgentTranscript {
    pub fn push(&mut self, mut turn: AgentTurn) {
        turn.index = self.turns.len();
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[AgentTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&AgentTurn> {
        self.turns.last()
    }

    pub fn draft_response(&self) -> Option<&str> {
        self.turns.last().and_then(|turn| turn.draft_response.as_deref())
    }

    pub fn terminal(&self) -> Option<TerminalReason> {
        self.turns.last().and_then(|turn| turn.terminal)
    }

    /// Turns that actually produced a tool result.
    pub fn tool_invocations(&self) -> usize {
        self.turns.iter().filter(|turn| turn.tool_result.is_some()).count()
    }

    pub fn latest_result(&self, tool: &str) -> Option<&ToolResult> {
        self.turns
            .iter()
            .rev()
            .filter(|turn| turn.tool_called.as_deref() == Some(tool))
            .find_map(|turn| turn.tool_result.as_ref())
    }

    /// How many times `tool` was invoked with exactly `input` and failed.
    pub fn failed_attempts(&self, tool: &str, input: &Value) -> u32 {
        let count = self
            .turns
            .iter()
            .filter(|turn| {
                turn.tool_called.as_deref() == Some(tool)
                    && turn.tool_input == *input
                    && turn.failed()
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// The price returned by the last successful pricing call.
    pub fn last_successful_price(&self) -> Option<&Price> {
        self.turns
            .iter()
            .rev()
            .find_map(|turn| turn.tool_result.as_ref().and_then(ToolResult::price))
    }
}

#[cfg(test)]
mod tests {
    use printguard_core::{ToolError, ToolResult};
    use serde_json::json;

    use super::{AgentTranscript, AgentTurn, TerminalReason};

    #[test]
    fn push_assigns_sequential_indices() {
        let mut transcript = AgentTranscript::default();
        transcript.push(AgentTurn::draft("first"));
        transcript.push(AgentTurn::terminal(TerminalReason::Cancelled, "stop"));

        let indices: Vec<usize> = transcript.turns().iter().map(|turn| turn.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(transcript.terminal(), Some(TerminalReason::Cancelled));
        assert_eq!(transcript.draft_response(), None);
    }

    #[test]
    fn failed_attempts_match_tool_and_input() {
        let mut transcript = AgentTranscript::default();
        let input = json!({"paper_stock": "vinyl"});
        let timeout =
            ToolResult::Err(ToolError::Timeout { tool: "check_inventory".into(), after_ms: 5 });
        transcript.push(AgentTurn::tool("check_inventory", input.clone(), timeout.clone()));
        transcript.push(AgentTurn::tool(
            "check_inventory",
            json!({"paper_stock": "kraft"}),
            timeout,
        ));

        assert_eq!(transcript.failed_attempts("check_inventory", &input), 1);
        assert_eq!(transcript.failed_attempts("calculate_price", &input), 0);
        assert_eq!(transcript.tool_invocations(), 2);
        assert!(transcript.last_successful_price().is_none());
    }

    #[test]
    fn terminal_reason_serializes_as_code() {
        let json = serde_json::to_value(TerminalReason::ReasoningExhausted).expect("serializes");
        assert_eq!(json, "REASONING_EXHAUSTED");
        assert_eq!(TerminalReason::ToolFailure.code(), "TOOL_FAILURE");
    }
}

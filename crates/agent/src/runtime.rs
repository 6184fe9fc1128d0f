use std::sync::Arc;

use printguard_core::config::{AgentConfig, MAX_AGENT_TURNS};
use printguard_core::{FileReference, GuardrailVerdict, OrderSpec, ToolResult};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::guardrails::PreflightGuardrail;
use crate::planner::{DeterministicPlanner, PlannedStep, Planner, PlanningContext};
use crate::tools::{ToolCall, ToolRegistry};
use crate::transcript::{AgentTranscript, AgentTurn, TerminalReason};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Reasoning,
    ToolCall,
    Drafting,
    Done,
    Exhausted,
}

/// Result of one agent run. `preflight` is set when the resolution step ran
/// through the artwork guardrail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentRun {
    pub transcript: AgentTranscript,
    pub preflight: Option<GuardrailVerdict>,
    pub state: AgentState,
}

/// Bounded reasoning loop over the registered tools.
///
/// Every turn either invokes one tool or emits a draft. The transcript never
/// holds more than `max_turns` turns: when the planner still wants a tool on
/// the last available turn, that slot is spent on a `REASONING_EXHAUSTED`
/// marker instead.
pub struct OrderAgent<P = DeterministicPlanner> {
    planner: P,
    registry: Arc<ToolRegistry>,
    preflight: Arc<PreflightGuardrail>,
    max_turns: usize,
    max_retries_per_call: u32,
}

impl OrderAgent<DeterministicPlanner> {
    pub fn deterministic(
        registry: Arc<ToolRegistry>,
        preflight: Arc<PreflightGuardrail>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(DeterministicPlanner, registry, preflight, config)
    }
}

impl<P> OrderAgent<P>
where
    P: Planner,
{
    pub fn new(
        planner: P,
        registry: Arc<ToolRegistry>,
        preflight: Arc<PreflightGuardrail>,
        config: &AgentConfig,
    ) -> Self {
        let max_turns = config.max_turns.clamp(1, MAX_AGENT_TURNS);
        Self {
            planner,
            registry,
            preflight,
            max_turns: usize::try_from(max_turns).unwrap_or(1),
            max_retries_per_call: config.max_retries_per_call.min(1),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub async fn process_order(
        &self,
        user_query: &str,
        order: &OrderSpec,
        file_ref: Option<&FileReference>,
        cancel: &CancellationToken,
    ) -> AgentRun {
        let mut transcript = AgentTranscript::default();
        let mut preflight = None;
        let mut state = AgentState::Reasoning;

        while state == AgentState::Reasoning {
            let last_slot = transcript.len() + 1 >= self.max_turns;
            let context = PlanningContext { user_query, order, file_ref, transcript: &transcript };

            let planned = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                step = self.planner.next_step(&context) => Some(step),
            };
            let Some(planned) = planned else {
                transcript.push(cancelled_turn());
                state = transition(state, AgentState::Done);
                break;
            };

            let call = match planned {
                Err(error) => {
                    warn!(event_name = "agent.planner.failed", error = %error, "planner failed");
                    transcript.push(AgentTurn::terminal(
                        TerminalReason::PlannerFailure,
                        format!("{error:#}"),
                    ));
                    state = transition(state, AgentState::Done);
                    continue;
                }
                Ok(PlannedStep::Draft(text)) => {
                    state = transition(state, AgentState::Drafting);
                    transcript.push(AgentTurn::draft(text));
                    state = transition(state, AgentState::Done);
                    continue;
                }
                Ok(PlannedStep::Abandon { reason }) => {
                    let marker = if transcript.last().is_some_and(AgentTurn::failed) {
                        TerminalReason::ToolFailure
                    } else {
                        TerminalReason::PlannerFailure
                    };
                    transcript.push(AgentTurn::terminal(marker, reason));
                    state = transition(state, AgentState::Done);
                    continue;
                }
                Ok(PlannedStep::CallTool(call)) => call,
            };

            if last_slot {
                transcript.push(AgentTurn::terminal(
                    TerminalReason::ReasoningExhausted,
                    format!(
                        "turn bound of {} reached while `{}` was still pending",
                        self.max_turns,
                        call.name()
                    ),
                ));
                state = transition(state, AgentState::Exhausted);
                continue;
            }

            let input = call.input();
            if transcript.failed_attempts(call.name(), &input) > self.max_retries_per_call {
                transcript.push(
                    AgentTurn::terminal(
                        TerminalReason::ToolFailure,
                        format!(
                            "`{}` kept failing after {} retry",
                            call.name(),
                            self.max_retries_per_call
                        ),
                    )
                    .with_call(call.name(), input),
                );
                state = transition(state, AgentState::Done);
                continue;
            }

            state = transition(state, AgentState::ToolCall);
            let Some(turn) = self.invoke(order, &call, cancel, &mut preflight).await else {
                transcript.push(cancelled_turn().with_call(call.name(), input));
                state = transition(state, AgentState::Done);
                continue;
            };
            let halted = turn.terminal.is_some();
            transcript.push(turn);
            state = transition(
                state,
                if halted { AgentState::Done } else { AgentState::Reasoning },
            );
        }

        info!(
            event_name = "agent.run.finished",
            turns = transcript.len(),
            tool_invocations = transcript.tool_invocations(),
            terminal = transcript.terminal().map(|reason| reason.code()),
            drafted = transcript.draft_response().is_some(),
            "agent run finished"
        );

        AgentRun { transcript, preflight, state }
    }

    /// Runs one tool call. Artwork-dependent calls go through the preflight
    /// guardrail, and a failing verdict halts the transcript on that turn.
    /// Returns `None` when cancelled mid-call.
    async fn invoke(
        &self,
        order: &OrderSpec,
        call: &ToolCall,
        cancel: &CancellationToken,
        preflight: &mut Option<GuardrailVerdict>,
    ) -> Option<AgentTurn> {
        if let ToolCall::CheckResolution { file_ref, .. } = call {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = self.preflight.validate_artwork(file_ref, order) => Some(outcome),
            }?;
            let mut turn =
                AgentTurn::tool(outcome.call.name(), outcome.call.input(), outcome.result);
            if !outcome.verdict.passed {
                turn = turn.with_terminal(
                    TerminalReason::PreflightBlocked,
                    outcome.verdict.codes().join(", "),
                );
            }
            *preflight = Some(outcome.verdict);
            return Some(turn);
        }

        let result: ToolResult = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.registry.execute(call) => Some(result),
        }?;
        Some(AgentTurn::tool(call.name(), call.input(), result))
    }
}

fn cancelled_turn() -> AgentTurn {
    AgentTurn::terminal(TerminalReason::Cancelled, "request cancelled by caller")
}

fn transition(from: AgentState, to: AgentState) -> AgentState {
    debug!(event_name = "agent.state.transition", from = ?from, to = ?to, "agent state changed");
    to
}

//! Order agent and guardrail pipeline
//!
//! This crate wraps a tool-calling order agent in three guardrail layers:
//! - **Layer 1** (`guardrails::spec_check`) - production feasibility of the
//!   order, before any tool runs
//! - **Layer 2** (`guardrails::preflight`) - artwork resolution against the
//!   requested print size
//! - **Layer 3** (`guardrails::quote`) - every price in the draft must come
//!   from a successful pricing call
//!
//! # Architecture
//!
//! 1. **Intent Extraction** (`conversation`) - free text → `OrderSpecInput`
//! 2. **Reasoning** (`planner`, `runtime`) - bounded loop, one tool per turn
//! 3. **Tool Execution** (`tools`) - registry with timeouts and capability status
//! 4. **Composition** (`pipeline`) - runs the layers and gates the response
//!
//! # Safety Principle
//!
//! The planner is strictly a translator. It NEVER decides prices; the pricing
//! tool does, and Layer 3 rejects any draft that disagrees with it.

pub mod conversation;
pub mod guardrails;
pub mod pipeline;
pub mod planner;
pub mod runtime;
pub mod tools;
pub mod transcript;

pub use pipeline::{
    GuardrailPipeline, PipelineError, PipelineResult, ProcessOrderRequest, ResponseEnvelope,
};
pub use planner::{DeterministicPlanner, PlannedStep, Planner, PlanningContext};
pub use runtime::{AgentRun, AgentState, OrderAgent};
pub use tools::{ToolCall, ToolRegistry};
pub use transcript::{AgentTranscript, AgentTurn, TerminalReason};

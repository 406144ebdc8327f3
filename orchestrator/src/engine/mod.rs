//! Tool-execution engine
//!
//! The engine is the remote service that turns a procedure into tool calls
//! and runs them. The controller only needs two capabilities from it:
//! - propose the first tool call for a procedure
//! - execute (or skip) the pending call and propose the next one
//!
//! Calls are single attempts; failures are surfaced, never retried here.

mod http;

pub use http::HttpToolEngine;

use async_trait::async_trait;

use crate::issue::IssueContext;
use crate::step::ToolCall;

/// Failures talking to the engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine request timed out")]
    Timeout,

    #[error("engine unreachable: {0}")]
    Transport(String),

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("engine returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Input for proposing the first call of a session
#[derive(Debug, Clone)]
pub struct FirstCallRequest {
    pub thread_id: String,
    pub procedure: String,
    pub issue: IssueContext,
}

/// Input for executing or skipping the pending call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub thread_id: String,
    pub approved: bool,
    pub feedback: Option<String>,
}

/// What the engine reports after executing or skipping a call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionOutcome {
    /// Raw tool payload, usually a JSON document encoded as a string
    pub raw_result: Option<String>,

    /// The next call, present when more steps remain
    pub next_call: Option<ToolCall>,
}

impl ExecutionOutcome {
    /// Outcome of the final step of a procedure
    pub fn finished(raw_result: impl Into<String>) -> Self {
        Self {
            raw_result: Some(raw_result.into()),
            next_call: None,
        }
    }

    /// Set the next proposed call
    pub fn with_next_call(mut self, call: ToolCall) -> Self {
        self.next_call = Some(call);
        self
    }

    pub fn has_next_tool(&self) -> bool {
        self.next_call.is_some()
    }
}

/// The remote tool-execution engine
#[async_trait]
pub trait ToolEngine: Send + Sync {
    /// Propose the first tool call for a procedure
    async fn propose_first_call(&self, request: &FirstCallRequest) -> Result<ToolCall, EngineError>;

    /// Execute the pending call if approved, skip it otherwise
    async fn execute_or_skip(&self, request: &ExecuteRequest) -> Result<ExecutionOutcome, EngineError>;
}

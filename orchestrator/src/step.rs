//! Step records
//!
//! A step is one planned tool invocation inside a session. Records move
//! strictly forward through `PendingApproval -> Waiting -> Completed`;
//! the planned call itself never changes once the record exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::interpreter::NormalizedResult;

/// A tool call proposed by the tool-execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier of the tool (e.g. `inspect_damage`)
    #[serde(rename = "tool_name")]
    pub name: String,

    /// Arguments proposed for the call
    #[serde(rename = "tool_arguments", default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Proposed, awaiting a human decision
    PendingApproval,
    /// Decision sent downstream, result not yet received
    Waiting,
    /// Terminal; executed or skipped
    Completed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::PendingApproval => "pending_approval",
            StepStatus::Waiting => "waiting",
            StepStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// The human decision recorded against a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDecision {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl StepDecision {
    pub fn approve() -> Self {
        Self {
            approved: true,
            feedback: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            approved: false,
            feedback: None,
        }
    }

    /// Attach a free-text note forwarded to the engine
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Attempted a transition the step lifecycle does not allow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step transition `{from}` -> `{to}` is invalid")]
pub struct InvalidTransition {
    pub from: StepStatus,
    pub to: StepStatus,
}

/// One planned tool invocation and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(flatten)]
    call: ToolCall,
    status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decision: Option<StepDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<NormalizedResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StepRecord {
    /// Create a freshly proposed step; every step starts pending approval
    pub fn pending(call: ToolCall) -> Self {
        let now = Utc::now();
        Self {
            call,
            status: StepStatus::PendingApproval,
            decision: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn call(&self) -> &ToolCall {
        &self.call
    }

    pub fn tool_name(&self) -> &str {
        &self.call.name
    }

    pub fn tool_arguments(&self) -> &Map<String, Value> {
        &self.call.arguments
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn decision(&self) -> Option<&StepDecision> {
        self.decision.as_ref()
    }

    /// Normalized result; only ever present once the step is completed
    pub fn result(&self) -> Option<&NormalizedResult> {
        self.result.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Human-readable tool name
    pub fn display_name(&self) -> String {
        display_name(&self.call.name)
    }

    /// Record the human decision and mark the step in flight
    pub fn mark_waiting(&mut self, decision: StepDecision) -> Result<(), InvalidTransition> {
        self.transition(StepStatus::Waiting)?;
        self.decision = Some(decision);
        Ok(())
    }

    /// Mark the step terminal and attach whatever result the engine returned
    pub fn complete(&mut self, result: Option<NormalizedResult>) -> Result<(), InvalidTransition> {
        self.transition(StepStatus::Completed)?;
        self.result = result;
        Ok(())
    }

    fn transition(&mut self, to: StepStatus) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self.status, to),
            (StepStatus::PendingApproval, StepStatus::Waiting)
                | (StepStatus::Waiting, StepStatus::Completed)
        );
        if !allowed {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Turn `get_payment_status` into `Get Payment Status`
pub fn display_name(tool_name: &str) -> String {
    tool_name
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

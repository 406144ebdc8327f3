//! Human-in-the-loop execution of standard operating procedures
//!
//! A remote tool-execution engine turns a free-text procedure into a
//! sequence of tool calls. This crate sits between that engine and a
//! human operator:
//! - every proposed call is recorded and held until approved or rejected
//! - decisions are forwarded to the engine, which executes or skips the call
//! - raw tool payloads are normalized (damage findings, annotated images)
//! - the full step history of each thread can be polled at any time
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sop_orchestrator::{HttpToolEngine, ResultInterpreter, StepDecision, WorkflowController};
//!
//! let controller = WorkflowController::new(
//!     Arc::new(HttpToolEngine::new(&config.engine)),
//!     ResultInterpreter::new("http://localhost:8000"),
//! );
//!
//! let started = controller.start_execution("t-1", procedure, &issue).await?;
//! let outcome = controller.action_step("t-1", 0, StepDecision::approve()).await?;
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod issue;
pub mod ledger;
pub mod procedure;
pub mod step;
pub mod web;

pub use config::{ConfigError, OrchestratorConfig};
pub use controller::{ActionOutcome, SessionPhase, StartOutcome, WorkflowController};
pub use engine::{EngineError, ExecuteRequest, ExecutionOutcome, FirstCallRequest, HttpToolEngine, ToolEngine};
pub use error::ControllerError;
pub use interpreter::{Finding, NormalizedResult, ResultInterpreter, Severity};
pub use issue::IssueContext;
pub use ledger::Ledger;
pub use step::{StepDecision, StepRecord, StepStatus, ToolCall};

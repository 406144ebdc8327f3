//! Workflow controller
//!
//! Drives one procedure per thread through the approval loop:
//! - `start_execution` asks the engine for the first call and records it
//!   pending approval
//! - `action_step` forwards a human approve/reject decision, records the
//!   result and appends the next proposed call, if any
//! - `current_steps` returns a snapshot of the thread's records
//!
//! Within a thread every mutation is serialized; different threads run
//! independently. Engine calls are the only suspension points.

use std::sync::Arc;

use serde::Serialize;

use crate::config::OrchestratorConfig;
use crate::engine::{ExecuteRequest, FirstCallRequest, HttpToolEngine, ToolEngine};
use crate::error::ControllerError;
use crate::interpreter::ResultInterpreter;
use crate::issue::IssueContext;
use crate::ledger::{Ledger, LedgerError};
use crate::step::{StepDecision, StepRecord, StepStatus};

/// A freshly proposed first step and where it sits in the thread's ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartOutcome {
    pub index: usize,
    pub step: StepRecord,
}

/// Result of approving or rejecting a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    /// The actioned step, now completed
    pub updated: StepRecord,
    /// The newly proposed step, when the engine has more to do
    pub next: Option<StepRecord>,
}

/// Where a thread currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing recorded yet
    Idle,
    /// A step is waiting for a human decision
    AwaitingApproval,
    /// A decision was sent and the engine has not answered (or failed)
    InFlight,
    /// Every recorded step is completed
    Finished,
}

impl SessionPhase {
    pub fn of(steps: &[StepRecord]) -> Self {
        match steps.iter().rev().find(|step| !step.is_completed()) {
            Some(step) if step.status() == StepStatus::Waiting => SessionPhase::InFlight,
            Some(_) => SessionPhase::AwaitingApproval,
            None if steps.is_empty() => SessionPhase::Idle,
            None => SessionPhase::Finished,
        }
    }
}

/// The approval state machine
pub struct WorkflowController {
    engine: Arc<dyn ToolEngine>,
    interpreter: ResultInterpreter,
    ledger: Ledger,
}

impl WorkflowController {
    /// Create a controller around an engine
    pub fn new(engine: Arc<dyn ToolEngine>, interpreter: ResultInterpreter) -> Self {
        Self {
            engine,
            interpreter,
            ledger: Ledger::new(),
        }
    }

    /// Create a controller that talks to the configured HTTP engine
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            Arc::new(HttpToolEngine::new(&config.engine)),
            ResultInterpreter::new(&config.artifacts.base_url),
        )
    }

    pub fn interpreter(&self) -> &ResultInterpreter {
        &self.interpreter
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Begin executing a procedure on a thread
    ///
    /// Fails with `Conflict` if the thread already has a step pending or in
    /// flight. Nothing is recorded unless the engine proposes a call, and a
    /// thread that never committed a step is forgotten again on failure.
    #[tracing::instrument(skip(self, procedure, issue), fields(user_id = %issue.user_id))]
    pub async fn start_execution(
        &self,
        thread_id: &str,
        procedure: &str,
        issue: &IssueContext,
    ) -> Result<StartOutcome, ControllerError> {
        if thread_id.trim().is_empty() {
            return Err(ControllerError::InvalidRequest(
                "thread id must not be empty".to_string(),
            ));
        }
        if procedure.trim().is_empty() {
            return Err(ControllerError::InvalidRequest(
                "procedure must not be empty".to_string(),
            ));
        }

        let session = self.ledger.session_or_create(thread_id).await;
        let writes = session.lock_writes().await;

        if let Some(index) = session.active_index().await {
            return Err(ControllerError::Conflict(format!(
                "thread `{}` already has an active step at index {}",
                thread_id, index
            )));
        }

        let request = FirstCallRequest {
            thread_id: thread_id.to_string(),
            procedure: procedure.to_string(),
            issue: issue.clone(),
        };
        let call = match self.engine.propose_first_call(&request).await {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!("Engine failed to propose a first call: {}", e);
                drop(writes);
                drop(session);
                self.ledger.discard_if_empty(thread_id).await;
                return Err(ControllerError::Upstream(e));
            }
        };

        let step = StepRecord::pending(call);
        let index = session.append(step.clone()).await;
        tracing::info!(
            step_index = index,
            tool = step.tool_name(),
            "Step proposed, awaiting approval"
        );

        Ok(StartOutcome { index, step })
    }

    /// Approve or reject the step at `step_index`
    ///
    /// The step is marked waiting before the engine is called. If the engine
    /// fails the step stays waiting: the decision has already been sent.
    #[tracing::instrument(skip(self, decision), fields(approved = decision.approved))]
    pub async fn action_step(
        &self,
        thread_id: &str,
        step_index: usize,
        decision: StepDecision,
    ) -> Result<ActionOutcome, ControllerError> {
        let session = self
            .ledger
            .session(thread_id)
            .await
            .ok_or_else(|| LedgerError::SessionNotFound(thread_id.to_string()))?;
        let _writes = session.lock_writes().await;

        let request = ExecuteRequest {
            thread_id: thread_id.to_string(),
            approved: decision.approved,
            feedback: decision.feedback.clone(),
        };

        session
            .update(step_index, |step| step.mark_waiting(decision))
            .await
            .ok_or_else(|| LedgerError::StepNotFound {
                thread_id: thread_id.to_string(),
                index: step_index,
            })??;

        let outcome = self.engine.execute_or_skip(&request).await.map_err(|e| {
            tracing::warn!("Engine failed, step {} left waiting: {}", step_index, e);
            ControllerError::Upstream(e)
        })?;

        let result = self.interpreter.interpret(outcome.raw_result.as_deref());
        let updated = session
            .update(step_index, |step| {
                step.complete(result).map(|_| step.clone())
            })
            .await
            .ok_or_else(|| LedgerError::StepNotFound {
                thread_id: thread_id.to_string(),
                index: step_index,
            })??;
        tracing::info!(
            tool = updated.tool_name(),
            has_result = updated.result().is_some(),
            "Step completed"
        );

        let next = match outcome.next_call {
            Some(call) => {
                let record = StepRecord::pending(call);
                let index = session.append(record.clone()).await;
                tracing::info!(
                    step_index = index,
                    tool = record.tool_name(),
                    "Next step proposed, awaiting approval"
                );
                Some(record)
            }
            None => {
                tracing::info!("Procedure finished");
                None
            }
        };

        Ok(ActionOutcome { updated, next })
    }

    /// Snapshot of a thread's steps; empty when the thread is unknown
    pub async fn current_steps(&self, thread_id: &str) -> Vec<StepRecord> {
        self.ledger.get(thread_id).await.unwrap_or_default()
    }
}

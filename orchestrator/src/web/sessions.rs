//! Session API handlers
//!
//! REST endpoints over the workflow controller:
//! - start a procedure on a thread
//! - approve or reject a step
//! - poll the steps recorded so far

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::api::{controller_error, ApiError};
use super::state::AppState;
use crate::controller::SessionPhase;
use crate::issue::IssueContext;
use crate::procedure;
use crate::step::{StepDecision, StepRecord};

// ============================================================================
// Response types
// ============================================================================

/// A step as shown to the UI
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub index: usize,
    pub display_name: String,
    #[serde(flatten)]
    pub record: StepRecord,
}

impl StepView {
    fn new(index: usize, record: StepRecord) -> Self {
        Self {
            index,
            display_name: record.display_name(),
            record,
        }
    }
}

/// Response to starting a procedure
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub step: StepView,
    /// Numbered steps of the procedure, for display alongside the ledger
    pub outline: Vec<String>,
}

/// Response to approving or rejecting a step
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub updated: StepView,
    pub next: Option<StepView>,
}

/// Every step recorded for a thread
#[derive(Debug, Serialize)]
pub struct StepsResponse {
    pub thread_id: String,
    pub phase: SessionPhase,
    pub steps: Vec<StepView>,
}

// ============================================================================
// Request types
// ============================================================================

/// Start request
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub procedure: String,
    pub issue: IssueContext,
}

/// Approve/reject request
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start executing a procedure
pub async fn start_session(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(req): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let mut issue = req.issue;
    if issue.thread_id != thread_id {
        tracing::debug!(
            "Issue thread `{}` replaced by path thread `{}`",
            issue.thread_id,
            thread_id
        );
        issue.thread_id = thread_id.clone();
    }

    let started = state
        .controller
        .start_execution(&thread_id, &req.procedure, &issue)
        .await
        .map_err(controller_error)?;

    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            step: StepView::new(started.index, started.step),
            outline: procedure::outline(&req.procedure),
        }),
    ))
}

/// Approve or reject a step
pub async fn action_step(
    State(state): State<AppState>,
    Path((thread_id, index)): Path<(String, usize)>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let decision = StepDecision {
        approved: req.approved,
        feedback: req.feedback.filter(|f| !f.trim().is_empty()),
    };

    let outcome = state
        .controller
        .action_step(&thread_id, index, decision)
        .await
        .map_err(controller_error)?;

    let next = outcome.next.map(|record| StepView::new(index + 1, record));
    Ok(Json(ActionResponse {
        updated: StepView::new(index, outcome.updated),
        next,
    }))
}

/// List the steps of a thread
pub async fn list_steps(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Json<StepsResponse> {
    let records = state.controller.current_steps(&thread_id).await;
    let phase = SessionPhase::of(&records);
    let steps = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| StepView::new(index, record))
        .collect();

    Json(StepsResponse {
        thread_id,
        phase,
        steps,
    })
}

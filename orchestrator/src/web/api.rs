//! Common API types and handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::state::AppState;
use crate::error::ControllerError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a controller error onto an HTTP status
pub fn controller_error(e: ControllerError) -> ApiError {
    let status = match &e {
        ControllerError::Conflict(_) => StatusCode::CONFLICT,
        ControllerError::NotFound(_) => StatusCode::NOT_FOUND,
        ControllerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ControllerError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    } else {
        tracing::debug!("Request rejected: {}", e);
    }

    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine_url: String,
    pub artifact_base_url: String,
}

/// Health check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine_url: state.engine_url.clone(),
        artifact_base_url: state.artifact_base_url.clone(),
    })
}

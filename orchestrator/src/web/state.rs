//! Shared application state

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::controller::WorkflowController;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The approval state machine, shared by every request
    pub controller: Arc<WorkflowController>,
    /// Tool-execution engine base URL
    pub engine_url: String,
    /// Artifact server base URL
    pub artifact_base_url: String,
}

impl AppState {
    /// Create new app state around an existing controller
    pub fn new(
        controller: Arc<WorkflowController>,
        engine_url: impl Into<String>,
        artifact_base_url: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            engine_url: engine_url.into(),
            artifact_base_url: artifact_base_url.into(),
        }
    }

    /// Create app state talking to the configured HTTP engine
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            Arc::new(WorkflowController::from_config(config)),
            config.engine.url.clone(),
            config.artifacts.base_url.clone(),
        )
    }
}

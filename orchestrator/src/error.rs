//! Controller errors

use crate::engine::EngineError;
use crate::ledger::LedgerError;
use crate::step::InvalidTransition;

/// Errors surfaced by the workflow controller
///
/// Precondition failures (`Conflict`, `NotFound`, `InvalidRequest`) are
/// detected before any engine call is made and leave the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream engine failure: {0}")]
    Upstream(#[from] EngineError),
}

impl From<LedgerError> for ControllerError {
    fn from(e: LedgerError) -> Self {
        ControllerError::NotFound(e.to_string())
    }
}

impl From<InvalidTransition> for ControllerError {
    fn from(e: InvalidTransition) -> Self {
        ControllerError::Conflict(e.to_string())
    }
}

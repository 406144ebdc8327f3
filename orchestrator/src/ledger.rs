//! Session ledgers
//!
//! Each thread owns an append-only, ordered list of step records. Records
//! are updated in place by index and never reordered or removed.
//!
//! Reads and writes of the record list take a short-lived lock. Operations
//! that read, call out, and then write hold the session's writer lock for
//! their whole duration, so two mutating operations on one thread never
//! interleave while readers still see in-flight state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::step::{StepRecord, StepStatus};

/// Ledger lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("no session for thread `{0}`")]
    SessionNotFound(String),

    #[error("thread `{thread_id}` has no step at index {index}")]
    StepNotFound { thread_id: String, index: usize },

    #[error("thread `{0}` has no step pending approval")]
    NoPendingStep(String),
}

/// Ordered step history for one thread
#[derive(Debug)]
pub struct SessionLedger {
    thread_id: String,
    steps: RwLock<Vec<StepRecord>>,
    writer: Mutex<()>,
}

impl SessionLedger {
    fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            steps: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Serialize mutating operations on this session
    ///
    /// Hold the guard across the whole read-call-write sequence.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Copy of every record, in execution order
    pub async fn snapshot(&self) -> Vec<StepRecord> {
        self.steps.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.steps.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.steps.read().await.is_empty()
    }

    pub async fn get(&self, index: usize) -> Option<StepRecord> {
        self.steps.read().await.get(index).cloned()
    }

    /// Append a record and return its index
    pub async fn append(&self, record: StepRecord) -> usize {
        let mut steps = self.steps.write().await;
        steps.push(record);
        steps.len() - 1
    }

    /// Mutate the record at `index` in place
    pub async fn update<T>(&self, index: usize, f: impl FnOnce(&mut StepRecord) -> T) -> Option<T> {
        let mut steps = self.steps.write().await;
        steps.get_mut(index).map(f)
    }

    /// Index of the last record awaiting approval
    pub async fn last_pending_index(&self) -> Option<usize> {
        self.steps
            .read()
            .await
            .iter()
            .rposition(|step| step.status() == StepStatus::PendingApproval)
    }

    /// Index of the record that is pending approval or in flight, if any
    pub async fn active_index(&self) -> Option<usize> {
        self.steps
            .read()
            .await
            .iter()
            .rposition(|step| !step.is_completed())
    }
}

/// All session ledgers, keyed by thread id
#[derive(Debug, Default)]
pub struct Ledger {
    sessions: RwLock<HashMap<String, Arc<SessionLedger>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for `thread_id`
    pub async fn session(&self, thread_id: &str) -> Option<Arc<SessionLedger>> {
        self.sessions.read().await.get(thread_id).cloned()
    }

    /// Session for `thread_id`, created on first use
    pub async fn session_or_create(&self, thread_id: &str) -> Arc<SessionLedger> {
        if let Some(session) = self.session(thread_id).await {
            return session;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(thread_id, "Creating session ledger");
                Arc::new(SessionLedger::new(thread_id))
            })
            .clone()
    }

    /// Records of a thread
    ///
    /// A session that has never committed a record does not exist yet.
    pub async fn get(&self, thread_id: &str) -> Result<Vec<StepRecord>, LedgerError> {
        let session = self
            .session(thread_id)
            .await
            .ok_or_else(|| LedgerError::SessionNotFound(thread_id.to_string()))?;

        let steps = session.snapshot().await;
        if steps.is_empty() {
            return Err(LedgerError::SessionNotFound(thread_id.to_string()));
        }
        Ok(steps)
    }

    /// Append to a thread's ledger, creating it if needed
    pub async fn append(&self, thread_id: &str, record: StepRecord) -> usize {
        self.session_or_create(thread_id).await.append(record).await
    }

    pub async fn last_pending_index(&self, thread_id: &str) -> Result<usize, LedgerError> {
        let session = self
            .session(thread_id)
            .await
            .ok_or_else(|| LedgerError::SessionNotFound(thread_id.to_string()))?;

        session
            .last_pending_index()
            .await
            .ok_or_else(|| LedgerError::NoPendingStep(thread_id.to_string()))
    }

    /// Drop a session that never committed a record
    ///
    /// Left in place while anyone else still holds it. Returns whether the
    /// session was removed.
    pub async fn discard_if_empty(&self, thread_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(thread_id) else {
            return false;
        };
        if Arc::strong_count(session) > 1 || !session.is_empty().await {
            return false;
        }

        sessions.remove(thread_id);
        tracing::debug!(thread_id, "Discarded empty session ledger");
        true
    }

    /// Number of sessions with at least one record
    pub async fn session_count(&self) -> usize {
        let sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut count = 0;
        for session in sessions {
            if !session.is_empty().await {
                count += 1;
            }
        }
        count
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, LedgerError};
use crate::store::Ledger;

/// Persists conversation state so a later run can pick it up again.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Save a checkpoint of the current agent state.
    async fn checkpoint(&self, session_id: &str, state: &SessionState) -> Result<(), AgentError>;

    /// Load the most recent checkpoint for a session.
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, AgentError>;
}

/// Everything needed to resume a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub turn: usize,
    /// True when the last run ended with a final answer.
    #[serde(default)]
    pub finished: bool,
    pub context_snapshot: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// No persistence.
pub struct NoSessionManager;

#[async_trait]
impl SessionManager for NoSessionManager {
    async fn checkpoint(&self, _: &str, _: &SessionState) -> Result<(), AgentError> {
        Ok(())
    }

    async fn load(&self, _: &str) -> Result<Option<SessionState>, AgentError> {
        Ok(None)
    }
}

/// Stores session state as JSON in the ledger's `sessoes` table.
pub struct SqliteSessionManager {
    ledger: Arc<Ledger>,
}

impl SqliteSessionManager {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl SessionManager for SqliteSessionManager {
    async fn checkpoint(&self, session_id: &str, state: &SessionState) -> Result<(), AgentError> {
        let json = serde_json::to_string(state)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.ledger
            .save_session(session_id, &json, state.updated_at.naive_utc())?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, AgentError> {
        let Some(json) = self.ledger.load_session(session_id)? else {
            return Ok(None);
        };
        let state = serde_json::from_str(&json)
            .map_err(|e| AgentError::Session(format!("corrupt session {session_id}: {e}")))?;
        Ok(Some(state))
    }
}

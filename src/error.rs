#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("agent cancelled")]
    Cancelled,
    #[error("session error: {0}")]
    Session(String),
    #[error("context error: {0}")]
    Context(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Failures from the SQLite-backed ledger. Validation problems are not
/// errors; they come back as user-facing messages from the finance service.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("ledger lock poisoned")]
    Poisoned,
    #[error("migration {id} failed: {message}")]
    Migration { id: &'static str, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<LedgerError> for AgentError {
    fn from(e: LedgerError) -> Self {
        AgentError::Session(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Outcome of a finance operation that did not produce its normal message.
/// `Invalid` carries the user-facing validation text verbatim.
#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    #[error("{0}")]
    Invalid(String),
    #[error("Erro ao acessar o banco de dados: {0}")]
    Ledger(#[from] LedgerError),
}

impl FinanceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FinanceError::Invalid(message.into())
    }
}

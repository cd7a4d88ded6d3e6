use thiserror::Error;

/// Top-level error type for the dealcoach runtime.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("no conversation found")]
    NoConversation,

    #[error("LLM provider error ({provider}): {message}")]
    LlmError { provider: String, message: String },

    #[error("no JSON object found in model response")]
    NoJsonInResponse,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

use super::{
    ExtractionError, LifecycleError, LlmError, ResolutionError, RetrievalError,
    StorageError,
};

/// Top-level error type for the Engram memory system.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias.
pub type EngramResult<T> = Result<T, EngramError>;

/// Failures of the two narrow model capabilities. Callers recover locally
/// (degrade per the propagation policy); these never fail a whole turn.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Completion(String),

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// Extraction failures. These are recovered locally: the turn continues
/// with zero new semantic memories and the failure is logged, never raised
/// across the pipeline boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extraction response was not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("extraction timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("triple references unknown subject {subject_entity_id}")]
    UnknownSubject { subject_entity_id: String },
}

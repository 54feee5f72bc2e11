/// Persistence-layer failures. These roll back the turn transaction and
/// propagate to the caller; no partial state survives.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("unique constraint on {constraint}: {value}")]
    UniqueViolation { constraint: &'static str, value: String },

    #[error("optimistic lock lost on memory {memory_id} after retry")]
    OptimisticLockLost { memory_id: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("alias {alias:?} collides with canonical name of {entity_id}")]
    AliasShadowsCanonical { alias: String, entity_id: String },
}

use crate::models::EntityCandidate;

/// Entity-resolution outcomes that the caller must handle.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Multiple candidates landed within the ambiguity margin. The turn
    /// halts and the candidates go back to the caller for disambiguation.
    #[error("ambiguous mention {mention:?}: {} candidates", candidates.len())]
    AmbiguousEntity {
        mention: String,
        candidates: Vec<EntityCandidate>,
    },

    /// No stage resolved the mention.
    #[error("no entity found for mention {mention:?}")]
    EntityNotFound { mention: String },
}

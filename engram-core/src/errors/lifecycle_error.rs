/// Lifecycle failures: conflict resolution and consolidation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("conflict {conflict_id} already resolved")]
    AlreadyResolved { conflict_id: String },

    #[error("conflict {conflict_id} is missing data: {detail}")]
    MalformedConflict { conflict_id: String, detail: String },

    #[error("supersession would not point forward in time: {loser_id} is newer than {winner_id}")]
    BackwardSupersession { winner_id: String, loser_id: String },

    #[error("consolidation scope {scope} below threshold ({count} < {required})")]
    BelowThreshold {
        scope: String,
        count: usize,
        required: usize,
    },
}

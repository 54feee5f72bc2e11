use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An interpreted event: what happened in a turn, with meaning attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    pub memory_id: String,
    pub user_id: String,
    pub session_id: String,
    pub summary: String,
    /// Canonical entity ids referenced by this episode.
    pub entities: Vec<String>,
    pub embedding: Vec<f32>,
    /// Retrieval importance in [0, 1]. Attenuated after consolidation.
    pub importance: f64,
    pub source_event_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

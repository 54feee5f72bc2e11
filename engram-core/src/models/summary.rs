use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    Entity,
    Topic,
    SessionWindow,
}

impl SummaryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryScope::Entity => "entity",
            SummaryScope::Topic => "topic",
            SummaryScope::SessionWindow => "session_window",
        }
    }
}

/// Back-pointers from a summary to everything it consolidated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceData {
    pub episodic_ids: Vec<String>,
    pub semantic_ids: Vec<String>,
}

/// A consolidation of many memories within one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub summary_id: String,
    pub user_id: String,
    pub scope_type: SummaryScope,
    pub scope_identifier: String,
    pub summary_text: String,
    pub key_facts: Vec<String>,
    pub source_data: SourceData,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

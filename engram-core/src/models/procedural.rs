use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured features of the situation a procedural memory fires in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerFeatures {
    pub intent: String,
    pub entity_types: Vec<String>,
    pub topics: Vec<String>,
}

/// Operators a trigger predicate may use against domain facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOp {
    Equals,
    DaysUntil,
    Contains,
}

/// One condition evaluated against a domain-fact field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPredicate {
    pub field: String,
    pub op: TriggerOp,
    pub value: serde_json::Value,
}

/// What to do when the trigger matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionStructure {
    pub action_type: String,
    pub queries: Vec<String>,
    pub predicates: Vec<TriggerPredicate>,
}

/// A learned "when X then Y" policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralMemory {
    pub memory_id: String,
    pub user_id: String,
    /// Natural-language trigger description; the embedded text.
    pub trigger_pattern: String,
    pub trigger_features: TriggerFeatures,
    /// Natural-language statement of the learned action.
    pub action_heuristic: String,
    pub action_structure: ActionStructure,
    pub embedding: Vec<f32>,
    pub confidence: f64,
    pub observed_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};

use super::PredicateType;

/// A candidate triple as returned by the extraction LLM, before
/// normalization, embedding, and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTriple {
    pub subject_entity_id: String,
    pub predicate: String,
    pub predicate_type: PredicateType,
    pub object_value: serde_json::Value,
    /// Extractor's own confidence estimate; clamped downstream.
    #[serde(default)]
    pub confidence_hint: f64,
    /// Natural-language restatement of the triple.
    #[serde(default)]
    pub original_text: String,
}

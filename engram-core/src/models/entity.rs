use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pointer from a canonical entity into a domain-DB row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub table: String,
    pub primary_key: String,
}

/// The one true record for a real-world object referenced across memory.
///
/// `entity_id` is `<type>:<slug>`. Never mutated after creation except
/// `properties` and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub entity_id: String,
    pub entity_type: String,
    pub canonical_name: String,
    /// Free-form attributes, including cached domain-row fields.
    pub properties: serde_json::Value,
    pub external_ref: Option<ExternalRef>,
    pub created_by_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where an alias came from. `Manual` and `UserDisambiguation` aliases carry
/// confidence 1.0; `FuzzyLearned` carries the similarity that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasSource {
    Manual,
    FuzzyLearned,
    UserDisambiguation,
    Coreference,
}

impl AliasSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasSource::Manual => "manual",
            AliasSource::FuzzyLearned => "fuzzy_learned",
            AliasSource::UserDisambiguation => "user_disambiguation",
            AliasSource::Coreference => "coreference",
        }
    }
}

/// A string that resolves to a canonical entity. Global when `user_id` is
/// `None`, otherwise scoped to one user.
///
/// Invariant: `(alias_text, user_id)` unique; `alias_text` is NFC-normalized
/// and case-folded before storage (see [`crate::ids::fold_alias`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAlias {
    pub alias_id: String,
    pub canonical_entity_id: String,
    pub alias_text: String,
    pub source: AliasSource,
    pub user_id: Option<String>,
    pub confidence: f64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

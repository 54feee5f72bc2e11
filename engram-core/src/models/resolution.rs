use serde::{Deserialize, Serialize};

/// Which resolver stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Exact,
    Alias,
    Fuzzy,
    Coreference,
    DomainDb,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Exact => "exact",
            ResolutionMethod::Alias => "alias",
            ResolutionMethod::Fuzzy => "fuzzy",
            ResolutionMethod::Coreference => "coreference",
            ResolutionMethod::DomainDb => "domain_db",
        }
    }
}

/// A successful mention resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub entity_id: String,
    pub confidence: f64,
    pub method: ResolutionMethod,
    pub metadata: serde_json::Value,
}

/// A candidate surfaced when resolution is ambiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub entity_id: String,
    pub canonical_name: String,
    pub similarity: f64,
}

/// Everything the resolver knows about the turn asking for resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pub user_id: String,
    pub session_id: String,
    /// Canonical entity ids seen recently in this session, most recent first.
    pub recent_entities: Vec<String>,
    pub conversation_text: String,
}

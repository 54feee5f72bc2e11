//! Turn request/outcome types.

use engram_core::models::{ChatEvent, EntityCandidate, ReplyContext};

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub text: String,
    /// Mention strings the caller wants resolved (from its own tokenizer or
    /// UI selection). May be empty.
    pub mentions: Vec<String>,
    /// Retrieval strategy preset name.
    pub strategy: String,
    pub metadata: serde_json::Value,
}

impl TurnRequest {
    pub fn new(user_id: &str, session_id: &str, text: &str, mentions: Vec<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            text: text.to_string(),
            mentions: mentions.into_iter().map(String::from).collect(),
            strategy: engram_core::config::DEFAULT_STRATEGY.to_string(),
            metadata: serde_json::json!({}),
        }
    }
}

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assembled context, ready for the reply generator.
    Completed {
        event: ChatEvent,
        context: ReplyContext,
    },
    /// Resolution was ambiguous; the caller must disambiguate and re-ask.
    NeedsDisambiguation {
        event: ChatEvent,
        mention: String,
        candidates: Vec<EntityCandidate>,
    },
}

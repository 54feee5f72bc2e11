use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

/// An immutable, append-only chat turn. `content_hash` makes ingest
/// idempotent: a logically identical turn hashes to the same value and the
/// stored event is returned unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    pub event_id: String,
    pub session_id: String,
    pub user_id: String,
    pub role: ChatRole,
    pub content: String,
    pub content_hash: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ChatEvent {
    /// `hex(SHA-256(session_id || content || created_at))`.
    pub fn compute_content_hash(
        session_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(session_id.as_bytes());
        hasher.update(content.as_bytes());
        hasher.update(created_at.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

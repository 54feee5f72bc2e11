use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Env var holding the API key; the key itself never lives in config.
    pub api_key_env: String,
    pub completion_model: String,
    pub embedding_model: String,
    /// Per-capability budgets, seconds.
    pub embed_timeout_secs: u64,
    pub extract_timeout_secs: u64,
    pub consolidate_timeout_secs: u64,
    /// Size of the in-process embedding cache.
    pub embedding_cache_capacity: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "ENGRAM_LLM_API_KEY".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embed_timeout_secs: 2,
            extract_timeout_secs: 5,
            consolidate_timeout_secs: 10,
            embedding_cache_capacity: 4096,
        }
    }
}

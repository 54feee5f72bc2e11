use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the memory database. `:memory:` for tests.
    pub db_path: String,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    /// Embedding dimension D, fixed at deployment. All stored embeddings
    /// must match.
    pub vector_dimension: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "engram.db".to_string(),
            read_pool_size: 4,
            vector_dimension: 1536,
        }
    }
}

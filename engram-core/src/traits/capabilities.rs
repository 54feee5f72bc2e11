//! The narrow external capabilities. The core never depends on a specific
//! model or database engine; everything behind these traits is replaceable.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{LlmError, RetrievalError};

/// Text-in/text-out completion with a bounded budget.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, LlmError>;
}

/// `embed(text) → vector<f32, D>`. D is fixed at deployment; all stored
/// embeddings share it.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// The deployment-fixed dimension D.
    fn dimensions(&self) -> usize;
}

/// One row from the domain database, keyed by column name.
pub type DomainRow = serde_json::Map<String, serde_json::Value>;

/// Read-only SQL executor over the domain database. The core constructs
/// parameterized queries; it never issues writes — task completion emits a
/// suggested SQL patch string instead.
#[async_trait]
pub trait DomainDb: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<DomainRow>, RetrievalError>;
}

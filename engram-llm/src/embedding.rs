//! Embedding over an OpenAI-compatible endpoint, fronted by an L1 cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use serde::Deserialize;

use engram_core::config::LlmConfig;
use engram_core::errors::LlmError;
use engram_core::traits::Embedder;

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl HttpEmbeddingClient {
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::Embedding(format!("{} not set", config.api_key_env)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.embedding_model.clone(),
            dimensions,
            timeout: Duration::from_secs(config.embed_timeout_secs),
        })
    }

    async fn call_api(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = serde_json::json!({
            "model": &self.model,
            "input": text,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Embedding(format!("{status}: {body}")));
        }

        #[derive(Deserialize)]
        struct Item {
            embedding: Vec<f32>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            data: Vec<Item>,
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Embedding(e.to_string()))?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse)?;

        if vector.len() != self.dimensions {
            return Err(LlmError::Embedding(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        match tokio::time::timeout(self.timeout, self.call_api(text)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(target: "engram_llm", secs = self.timeout.as_secs(), "embedding timed out");
                Err(LlmError::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// L1 cache in front of any embedder, keyed by blake3 of the text. The same
/// natural-language form embeds once per process lifetime.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }

    fn cache_key(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let key = Self::cache_key(text);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.as_ref().clone());
        }
        let vector = self.inner.embed(text).await?;
        self.cache.insert(key, Arc::new(vector.clone()));
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn cache_prevents_repeat_calls() {
        let cached = CachedEmbedder::new(
            CountingEmbedder {
                calls: std::sync::atomic::AtomicUsize::new(0),
            },
            16,
        );
        let a = cached.embed("friday deliveries").await.unwrap();
        let b = cached.embed("friday deliveries").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(
            cached.inner.calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}

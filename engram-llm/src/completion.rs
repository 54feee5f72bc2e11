//! Chat completion over an OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use engram_core::config::LlmConfig;
use engram_core::errors::LlmError;
use engram_core::traits::LanguageModel;

pub struct HttpCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::Completion(format!("{} not set", config.api_key_env)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.completion_model.clone(),
        })
    }

    async fn call_api(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": 0.1,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Completion(format!("{status}: {body}")));
        }

        #[derive(Deserialize)]
        struct Message {
            content: String,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for HttpCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(timeout, self.call_api(prompt, max_tokens)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(target: "engram_llm", secs = timeout.as_secs(), "completion timed out");
                Err(LlmError::Timeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }
}

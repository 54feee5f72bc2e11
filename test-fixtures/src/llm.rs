//! Scripted language model: returns queued responses in order, then falls
//! back to a default. Tests that assert zero-LLM paths use `refusing()`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use engram_core::errors::LlmError;
use engram_core::traits::LanguageModel;

pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    default: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            default: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers `text`, regardless of the script.
    pub fn always(text: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Errors on every call; asserts paths that must not touch the LLM.
    pub fn refusing() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(
        &self,
        _prompt: &str,
        _max_tokens: u32,
        _timeout: Duration,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.responses.lock().expect("script lock").pop_front() {
            return Ok(next);
        }
        match &self.default {
            Some(text) => Ok(text.clone()),
            None => Err(LlmError::Completion("script exhausted".to_string())),
        }
    }
}

//! Coreference via the LLM: given recent entities and conversation text,
//! the model returns one of the offered ids or "none". The model's own
//! confidence is never trusted numerically; a hit gets a fixed constant.

use std::time::Duration;

use engram_core::errors::LlmError;
use engram_core::traits::LanguageModel;

/// Fixed confidence for any coreference hit.
pub const COREFERENCE_CONFIDENCE: f64 = 0.75;

const COREFERENCE_TIMEOUT: Duration = Duration::from_secs(5);
const COREFERENCE_MAX_TOKENS: u32 = 64;

pub fn build_prompt(mention: &str, recent_entities: &[String], conversation_text: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You resolve a referring expression to one of the entities recently \
         discussed in a conversation.\n\nRecent entities (ids):\n",
    );
    for id in recent_entities {
        prompt.push_str("- ");
        prompt.push_str(id);
        prompt.push('\n');
    }
    prompt.push_str("\nConversation:\n");
    prompt.push_str(conversation_text);
    prompt.push_str(&format!(
        "\n\nWhich entity does \"{mention}\" refer to? Answer with exactly one \
         id from the list above, or the word none."
    ));
    prompt
}

/// Only an id we actually offered counts; anything else is a miss.
pub fn parse_response(response: &str, recent_entities: &[String]) -> Option<String> {
    let answer = response.trim().trim_matches(|c| c == '"' || c == '`' || c == '.');
    if answer.eq_ignore_ascii_case("none") {
        return None;
    }
    recent_entities.iter().find(|id| *id == answer).cloned()
}

/// Ask the LLM to resolve the mention. A timeout or transport failure is a
/// miss, never an error: the caller falls through to the next stage.
pub async fn resolve(
    llm: &dyn LanguageModel,
    mention: &str,
    recent_entities: &[String],
    conversation_text: &str,
) -> Option<String> {
    if recent_entities.is_empty() {
        return None;
    }
    let prompt = build_prompt(mention, recent_entities, conversation_text);
    match llm
        .complete(&prompt, COREFERENCE_MAX_TOKENS, COREFERENCE_TIMEOUT)
        .await
    {
        Ok(response) => parse_response(&response, recent_entities),
        Err(LlmError::Timeout { seconds }) => {
            tracing::warn!(target: "engram_resolve", mention, seconds, "coreference timed out");
            None
        }
        Err(e) => {
            tracing::warn!(target: "engram_resolve", mention, error = %e, "coreference failed");
            None
        }
    }
}

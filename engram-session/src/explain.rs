//! The provenance walk behind `/explain`: from any memory id back to the
//! chat events and source memories that produced it.

use engram_core::models::ChatEvent;
use engram_core::EngramResult;

use crate::SessionPipeline;

/// One step of a provenance chain.
#[derive(Debug)]
pub struct ProvenanceStep {
    pub memory_id: String,
    pub layer: &'static str,
    pub text: String,
    /// The chat event this step walks back to, when it has one.
    pub source_event: Option<ChatEvent>,
}

impl SessionPipeline {
    /// Walk a memory's provenance. Follows `source_memory_id` chains and
    /// resolves `extracted_from_event_id` / `source_event_id` to the events
    /// themselves. The core never cites what it cannot walk back.
    pub async fn explain(&self, memory_id: &str) -> EngramResult<Vec<ProvenanceStep>> {
        let mut steps = Vec::new();
        let mut cursor = Some(memory_id.to_string());

        while let Some(id) = cursor.take() {
            if let Some(semantic) = self.memories().get_semantic(&id).await? {
                let source_event = match &semantic.extracted_from_event_id {
                    Some(event_id) => self.events().get(event_id).await?,
                    None => None,
                };
                cursor = semantic.source_memory_id.clone();
                steps.push(ProvenanceStep {
                    memory_id: id,
                    layer: "semantic",
                    text: semantic.original_text,
                    source_event,
                });
                continue;
            }
            // Not semantic: try episodic, then give up — summaries carry
            // their sources in source_data and end the chain here.
            if let Some(episode) = self.memories().get_episodic(&id).await? {
                let source_event = self.events().get(&episode.source_event_id).await?;
                steps.push(ProvenanceStep {
                    memory_id: id,
                    layer: "episodic",
                    text: episode.summary,
                    source_event,
                });
            }
            break;
        }
        Ok(steps)
    }
}

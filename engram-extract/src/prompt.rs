//! The extraction prompt and its response parser. The response must be a
//! JSON array of triples; anything else yields zero triples — no fallback
//! guessing.

use engram_core::models::{CanonicalEntity, ExtractedTriple, PredicateType};

pub fn build_prompt(message: &str, resolved: &[&CanonicalEntity]) -> String {
    let mut prompt = String::from(
        "Extract durable facts from the message as (subject, predicate, object) \
         triples.\n\nEntities in scope (use these exact ids as subjects):\n",
    );
    for entity in resolved {
        prompt.push_str(&format!(
            "- {} ({})\n",
            entity.entity_id, entity.canonical_name
        ));
    }
    prompt.push_str("\npredicate_type must be one of: ");
    prompt.push_str(
        &PredicateType::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    prompt.push_str(&format!("\n\nMessage:\n{message}\n"));
    prompt.push_str(
        "\nRespond with a JSON array only. Each element:\n\
         {\"subject_entity_id\": \"...\", \"predicate\": \"snake_case\", \
         \"predicate_type\": \"...\", \"object_value\": <json>, \
         \"confidence_hint\": 0.0, \"original_text\": \"natural language restatement\"}\n\
         \nExamples:\n\
         [{\"subject_entity_id\": \"customer:kai_media\", \"predicate\": \"prefers_delivery_day\", \
         \"predicate_type\": \"preference\", \"object_value\": {\"day\": \"friday\"}, \
         \"confidence_hint\": 0.85, \"original_text\": \"Kai Media prefers Friday deliveries\"}]\n\
         [{\"subject_entity_id\": \"customer:tc_boiler\", \"predicate\": \"payment_terms\", \
         \"predicate_type\": \"attribute\", \"object_value\": \"net15\", \
         \"confidence_hint\": 0.9, \"original_text\": \"TC Boiler uses NET15 payment terms\"}]\n\
         \nReturn [] when the message states no durable fact.",
    );
    prompt
}

/// Parse the model's reply. Returns `None` on malformed JSON; the caller
/// treats that as zero triples.
pub fn parse_triples(response: &str) -> Option<Vec<ExtractedTriple>> {
    let trimmed = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed).ok()
}

//! Conflict construction and the memory-vs-db probe.
//!
//! Detection never resolves anything: it appends `MemoryConflict` rows that
//! the lifecycle resolver consumes before the turn's reply is finalized.

use chrono::Utc;
use serde_json::Value;

use engram_core::models::{
    CanonicalEntity, ConflictType, DomainFact, MemoryConflict, SemanticMemory,
};
use engram_core::traits::DomainDb;
use engram_core::EngramResult;

use crate::normalize::{normalize_value, values_equivalent};

/// Predicates with an authoritative domain-DB column of the same name.
pub const DB_PREDICATES: [&str; 3] = ["payment_terms", "status", "credit_limit"];

pub fn memory_vs_memory(existing: &SemanticMemory, new: &SemanticMemory) -> MemoryConflict {
    MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsMemory,
        conflict_data: serde_json::json!({
            "existing_memory_id": existing.memory_id,
            "new_memory_id": new.memory_id,
            "subject_entity_id": existing.subject_entity_id,
            "predicate": existing.predicate,
            "existing_value": existing.object_value,
            "new_value": new.object_value,
        }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    }
}

pub fn memory_vs_db(
    memory: &SemanticMemory,
    db_value: &Value,
    table: &str,
    primary_key: &str,
) -> MemoryConflict {
    MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsDb,
        conflict_data: serde_json::json!({
            "memory_id": memory.memory_id,
            "subject_entity_id": memory.subject_entity_id,
            "predicate": memory.predicate,
            "memory_value": memory.object_value,
            "db_value": db_value,
            "table": table,
            "primary_key": primary_key,
        }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    }
}

/// Fetch the authoritative row behind `subject` and compare the column that
/// corresponds to `predicate`. `None` when the predicate has no DB
/// correspondent, the entity has no external ref, or the values agree.
pub async fn probe_db(
    domain: &dyn DomainDb,
    subject: &CanonicalEntity,
    memory: &SemanticMemory,
) -> EngramResult<Option<MemoryConflict>> {
    if !DB_PREDICATES.contains(&memory.predicate.as_str()) {
        return Ok(None);
    }
    let Some(external) = &subject.external_ref else {
        return Ok(None);
    };
    let Some(pk_col) = engram_core::domain::primary_key_column(&external.table) else {
        return Ok(None);
    };

    let rows = domain
        .execute(
            &format!(
                "SELECT * FROM {} WHERE {} = ?1",
                external.table, pk_col
            ),
            &[Value::String(external.primary_key.clone())],
        )
        .await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    let Some(db_value) = row.get(memory.predicate.as_str()) else {
        return Ok(None);
    };

    if values_equivalent(db_value, &memory.object_value) {
        return Ok(None);
    }
    tracing::info!(
        target: "engram_extract",
        memory_id = %memory.memory_id,
        predicate = %memory.predicate,
        "memory disagrees with domain db"
    );
    Ok(Some(memory_vs_db(
        memory,
        &normalize_value(db_value),
        &external.table,
        &external.primary_key,
    )))
}

/// Retrieval-time probe: compare freshly fetched domain facts against the
/// active memories whose subject and predicate they cover.
pub fn detect_against_facts(
    facts: &[DomainFact],
    memories: &[SemanticMemory],
) -> Vec<MemoryConflict> {
    let mut conflicts = Vec::new();
    for memory in memories {
        if !DB_PREDICATES.contains(&memory.predicate.as_str()) {
            continue;
        }
        for fact in facts {
            if fact.entity_id != memory.subject_entity_id {
                continue;
            }
            let Some(db_value) = fact.content.get(memory.predicate.as_str()) else {
                continue;
            };
            if !values_equivalent(db_value, &memory.object_value) {
                conflicts.push(memory_vs_db(
                    memory,
                    &normalize_value(db_value),
                    &fact.source_table,
                    fact.source_rows.first().map(String::as_str).unwrap_or(""),
                ));
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{ConfidenceFactors, MemoryStatus, PredicateType};

    fn memory(subject: &str, predicate: &str, value: Value) -> SemanticMemory {
        let now = Utc::now();
        SemanticMemory {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".into(),
            subject_entity_id: subject.into(),
            predicate: predicate.into(),
            predicate_type: PredicateType::Observation,
            object_value: value,
            original_text: String::new(),
            source_text: String::new(),
            related_entities: vec![],
            embedding: vec![],
            confidence: 0.7,
            confidence_factors: ConfidenceFactors::default(),
            reinforcement_count: 0,
            status: MemoryStatus::Active,
            last_validated_at: now,
            extracted_from_event_id: None,
            source_memory_id: None,
            superseded_by_memory_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fact_disagreement_is_detected() {
        let facts = vec![DomainFact {
            fact_type: "sales_order".into(),
            entity_id: "so:SO-1001".into(),
            content: serde_json::json!({"so_id": "SO-1001", "status": "in_fulfillment"}),
            source_table: "sales_orders".into(),
            source_rows: vec!["SO-1001".into()],
            retrieved_at: Utc::now(),
            risk: None,
        }];
        let memories = vec![memory("so:SO-1001", "status", serde_json::json!("fulfilled"))];
        let conflicts = detect_against_facts(&facts, &memories);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::MemoryVsDb);

        // Agreement produces nothing.
        let agreeing = vec![memory("so:SO-1001", "status", serde_json::json!("in_fulfillment"))];
        assert!(detect_against_facts(&facts, &agreeing).is_empty());
    }

    #[test]
    fn non_db_predicates_are_ignored() {
        let facts = vec![DomainFact {
            fact_type: "customer".into(),
            entity_id: "customer:kai_media".into(),
            content: serde_json::json!({"name": "Kai Media"}),
            source_table: "customers".into(),
            source_rows: vec!["C-1".into()],
            retrieved_at: Utc::now(),
            risk: None,
        }];
        let memories = vec![memory(
            "customer:kai_media",
            "prefers_delivery_day",
            serde_json::json!({"day": "friday"}),
        )];
        assert!(detect_against_facts(&facts, &memories).is_empty());
    }
}

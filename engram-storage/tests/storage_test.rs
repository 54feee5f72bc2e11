//! Storage integration: migrations, idempotent event log, entity store
//! invariants, semantic memory CRUD, and optimistic updates.

use chrono::Utc;

use engram_core::errors::StorageError;
use engram_core::models::*;
use engram_core::traits::{EntityStore, EventLog, MemoryStore, SemanticFilter};
use engram_core::EngramError;
use engram_storage::StorageEngine;

const DIM: usize = 8;

fn engine() -> StorageEngine {
    StorageEngine::open_in_memory(DIM).unwrap()
}

fn embedding(seed: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[0] = 1.0;
    v[1] = seed;
    v
}

fn event(session: &str, content: &str, at: chrono::DateTime<Utc>) -> ChatEvent {
    ChatEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        session_id: session.to_string(),
        user_id: "u1".to_string(),
        role: ChatRole::User,
        content: content.to_string(),
        content_hash: ChatEvent::compute_content_hash(session, content, at),
        metadata: serde_json::json!({}),
        created_at: at,
    }
}

fn entity(id: &str, name: &str) -> CanonicalEntity {
    let now = Utc::now();
    CanonicalEntity {
        entity_id: id.to_string(),
        entity_type: id.split(':').next().unwrap().to_string(),
        canonical_name: name.to_string(),
        properties: serde_json::json!({}),
        external_ref: None,
        created_by_user_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn semantic(subject: &str, predicate: &str, value: serde_json::Value) -> SemanticMemory {
    let now = Utc::now();
    SemanticMemory {
        memory_id: uuid::Uuid::new_v4().to_string(),
        user_id: "u1".to_string(),
        subject_entity_id: subject.to_string(),
        predicate: predicate.to_string(),
        predicate_type: PredicateType::Attribute,
        object_value: value,
        original_text: format!("{subject} {predicate}"),
        source_text: String::new(),
        related_entities: vec![subject.to_string()],
        embedding: embedding(0.5),
        confidence: 0.8,
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

#[tokio::test]
async fn duplicate_ingest_returns_stored_event() {
    let engine = engine();
    let at = Utc::now();
    let first = engine.append(event("s1", "hello", at)).await.unwrap();
    let second = engine.append(event("s1", "hello", at)).await.unwrap();
    assert_eq!(first.event_id, second.event_id);

    // Different content is a different event.
    let third = engine.append(event("s1", "goodbye", at)).await.unwrap();
    assert_ne!(first.event_id, third.event_id);
}

#[tokio::test]
async fn alias_lookup_prefers_user_scope() {
    let engine = engine();
    engine
        .create(&entity("customer:kai_media", "Kai Media"))
        .await
        .unwrap();
    engine
        .create(&entity("customer:other", "Other Co"))
        .await
        .unwrap();

    engine
        .create_alias(
            "customer:kai_media",
            "KM",
            AliasSource::Manual,
            None,
            1.0,
            serde_json::json!({}),
        )
        .await
        .unwrap();
    engine
        .create_alias(
            "customer:other",
            "KM",
            AliasSource::UserDisambiguation,
            Some("u1"),
            1.0,
            serde_json::json!({}),
        )
        .await
        .unwrap();

    let (_, hit) = engine.find_by_alias("km", Some("u1")).await.unwrap().unwrap();
    assert_eq!(hit.entity_id, "customer:other");

    let (_, global) = engine.find_by_alias("km", Some("u2")).await.unwrap().unwrap();
    assert_eq!(global.entity_id, "customer:kai_media");
}

#[tokio::test]
async fn alias_creation_is_idempotent_on_text_and_scope() {
    let engine = engine();
    engine
        .create(&entity("customer:kai_media", "Kai Media"))
        .await
        .unwrap();

    let first = engine
        .create_alias(
            "customer:kai_media",
            "Kay Media",
            AliasSource::FuzzyLearned,
            Some("u1"),
            0.9,
            serde_json::json!({}),
        )
        .await
        .unwrap();
    let second = engine
        .create_alias(
            "customer:kai_media",
            "kay media",
            AliasSource::FuzzyLearned,
            Some("u1"),
            0.8,
            serde_json::json!({}),
        )
        .await
        .unwrap();
    assert_eq!(first.alias_id, second.alias_id);
    assert_eq!(second.confidence, 0.9);
}

#[tokio::test]
async fn alias_shadowing_a_canonical_name_is_rejected() {
    let engine = engine();
    engine
        .create(&entity("customer:kai_media", "Kai Media"))
        .await
        .unwrap();
    engine
        .create(&entity("customer:tc_boiler", "TC Boiler"))
        .await
        .unwrap();

    let rejected = engine
        .create_alias(
            "customer:tc_boiler",
            "Kai Media",
            AliasSource::Manual,
            None,
            1.0,
            serde_json::json!({}),
        )
        .await;
    assert!(matches!(
        rejected,
        Err(EngramError::Storage(StorageError::AliasShadowsCanonical { .. }))
    ));
}

#[tokio::test]
async fn fuzzy_search_ranks_and_thresholds() {
    let engine = engine();
    engine
        .create(&entity("customer:kai_media", "Kai Media"))
        .await
        .unwrap();
    engine
        .create(&entity("customer:tc_boiler", "TC Boiler"))
        .await
        .unwrap();

    let hits = engine.fuzzy_search("Kay Media", 0.7, 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.entity_id, "customer:kai_media");
    assert!(hits[0].1 >= 0.85);
}

#[tokio::test]
async fn external_ref_creation_races_resolve_to_one_row() {
    let engine = engine();
    let mut first = entity("invoice:INV-1009", "INV-1009");
    first.external_ref = Some(ExternalRef {
        table: "invoices".into(),
        primary_key: "INV-1009".into(),
    });
    let mut second = entity("invoice:INV-1009-dup", "INV-1009 dup");
    second.external_ref = first.external_ref.clone();

    engine.create(&first).await.unwrap();
    // The second writer loses the unique index and rereads instead.
    engine.create(&second).await.unwrap();

    let stored = engine
        .lookup_by_external_ref("invoices", "INV-1009")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.entity_id, "invoice:INV-1009");
}

#[tokio::test]
async fn semantic_round_trip_and_structured_lookup() {
    let engine = engine();
    let memory = semantic("customer:kai_media", "payment_terms", serde_json::json!("net30"));
    engine.create_semantic(&memory).await.unwrap();

    let by_key = engine
        .semantic_by_subject_predicate("customer:kai_media", "payment_terms", "u1")
        .await
        .unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(by_key[0].object_value, serde_json::json!("net30"));

    let similar = engine
        .semantic_similar(
            &embedding(0.5),
            10,
            &SemanticFilter {
                user_id: Some("u1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(similar.len(), 1);
    assert!(similar[0].1 > 0.99);
}

#[tokio::test]
async fn optimistic_update_detects_stale_writers() {
    let engine = engine();
    let memory = semantic("customer:kai_media", "payment_terms", serde_json::json!("net30"));
    engine.create_semantic(&memory).await.unwrap();

    let fresh = engine.get_semantic(&memory.memory_id).await.unwrap().unwrap();
    let mut writer_a = fresh.clone();
    writer_a.confidence = 0.9;
    assert!(engine.update_semantic(&writer_a).await.unwrap());

    // Writer B still holds the pre-update row; its write must not land.
    let mut writer_b = fresh;
    writer_b.confidence = 0.1;
    assert!(!engine.update_semantic(&writer_b).await.unwrap());

    let stored = engine.get_semantic(&memory.memory_id).await.unwrap().unwrap();
    assert_eq!(stored.confidence, 0.9);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let engine = engine();
    let mut memory = semantic("customer:kai_media", "payment_terms", serde_json::json!("net30"));
    memory.embedding = vec![0.0; DIM + 1];
    let result = engine.create_semantic(&memory).await;
    assert!(matches!(
        result,
        Err(EngramError::Storage(StorageError::DimensionMismatch { .. }))
    ));
}

#[tokio::test]
async fn heuristic_overrides_round_trip_through_system_config() {
    let engine = engine();
    assert!(engine.load_heuristics_toml().await.unwrap().is_none());
    engine
        .save_heuristics_toml("[resolution]\nfuzzy_threshold = 0.8\n")
        .await
        .unwrap();
    let stored = engine.load_heuristics_toml().await.unwrap().unwrap();
    assert!(stored.contains("fuzzy_threshold = 0.8"));
}

#[tokio::test]
async fn on_disk_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = engram_core::config::StorageConfig {
        db_path: dir.path().join("engram.db").to_string_lossy().into_owned(),
        read_pool_size: 2,
        vector_dimension: DIM,
    };

    let at = Utc::now();
    let event_id = {
        let engine = StorageEngine::open(&config).unwrap();
        engine.append(event("s1", "persisted", at)).await.unwrap().event_id
    };

    // Reopen: migrations are a no-op and the event is still there.
    let engine = StorageEngine::open(&config).unwrap();
    let stored = engine.get(&event_id).await.unwrap().unwrap();
    assert_eq!(stored.content, "persisted");
}

#[tokio::test]
async fn terminal_memories_leave_retrieval() {
    let engine = engine();
    let memory = semantic("so:SO-1001", "status", serde_json::json!("fulfilled"));
    engine.create_semantic(&memory).await.unwrap();

    let mut stored = engine.get_semantic(&memory.memory_id).await.unwrap().unwrap();
    stored.status = MemoryStatus::Invalidated;
    assert!(engine.update_semantic(&stored).await.unwrap());

    let similar = engine
        .semantic_similar(&embedding(0.5), 10, &SemanticFilter::default())
        .await
        .unwrap();
    assert!(similar.is_empty());
}

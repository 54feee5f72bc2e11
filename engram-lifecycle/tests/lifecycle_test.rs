//! Lifecycle integration: conflict resolution against real storage and the
//! consolidation boost path with LLM and fallback summaries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use engram_core::config::HeuristicRegistry;
use engram_core::models::*;
use engram_core::traits::MemoryStore;
use engram_lifecycle::{validation, ConflictResolver, Consolidator};
use engram_storage::StorageEngine;
use test_fixtures::{fixture_engine, HashEmbedder, ScriptedLlm, FIXTURE_DIMENSIONS};

fn embedding() -> Vec<f32> {
    let mut v = vec![0.0f32; FIXTURE_DIMENSIONS];
    v[0] = 1.0;
    v
}

fn semantic(
    subject: &str,
    predicate: &str,
    value: serde_json::Value,
    reinforcement_count: u32,
    created_offset_secs: i64,
) -> SemanticMemory {
    let now = Utc::now();
    let created = now - chrono::Duration::seconds(created_offset_secs);
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
        embedding: embedding(),
        confidence: 0.7,
        confidence_factors: ConfidenceFactors::default(),
        reinforcement_count,
        status: MemoryStatus::Active,
        last_validated_at: created,
        extracted_from_event_id: None,
        source_memory_id: None,
        superseded_by_memory_id: None,
        created_at: created,
        updated_at: created,
    }
}

fn episode(entity_id: &str, i: usize) -> EpisodicMemory {
    let now = Utc::now();
    EpisodicMemory {
        memory_id: format!("ep-{i}"),
        user_id: "u1".to_string(),
        session_id: format!("s{}", i % 4),
        summary: format!("Kai Media confirmed Friday deliveries again ({i})"),
        entities: vec![entity_id.to_string()],
        embedding: embedding(),
        importance: 0.6,
        source_event_id: format!("ev-{i}"),
        created_at: now,
        updated_at: now,
    }
}

async fn seed_episode(engine: &StorageEngine, entity_id: &str, i: usize) {
    // Episodes reference chat events; seed one per episode.
    let at = Utc::now();
    let content = format!("turn {i}");
    engram_core::traits::EventLog::append(
        engine,
        ChatEvent {
            event_id: format!("ev-{i}"),
            session_id: format!("s{}", i % 4),
            user_id: "u1".to_string(),
            role: ChatRole::User,
            content: content.clone(),
            content_hash: ChatEvent::compute_content_hash(&format!("s{}", i % 4), &content, at),
            metadata: serde_json::json!({}),
            created_at: at,
        },
    )
    .await
    .unwrap();
    engine.create_episodic(&episode(entity_id, i)).await.unwrap();
}

#[tokio::test]
async fn memory_vs_db_conflict_invalidates_the_memory() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let memory = semantic("so:SO-1001", "status", serde_json::json!("fulfilled"), 0, 0);
    engine.create_semantic(&memory).await.unwrap();

    let conflict = MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsDb,
        conflict_data: serde_json::json!({
            "memory_id": memory.memory_id,
            "memory_value": "fulfilled",
            "db_value": "in_fulfillment",
        }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    };
    engine.create_conflict(&conflict).await.unwrap();

    let resolver = ConflictResolver::new(engine.clone(), Arc::new(HeuristicRegistry::default()));
    let resolved = resolver.resolve(&conflict).await.unwrap();

    assert_eq!(resolved.resolution_strategy, Some(ResolutionStrategy::TrustDb));
    assert!(resolved.is_resolved());
    let outcome = resolved.resolution_outcome.unwrap();
    assert_eq!(outcome.loser_id, memory.memory_id);

    let stored = engine.get_semantic(&memory.memory_id).await.unwrap().unwrap();
    assert_eq!(stored.status, MemoryStatus::Invalidated);
}

#[tokio::test]
async fn recent_observation_supersedes_under_trust_recent() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let older = semantic(
        "customer:tc_boiler",
        "payment_terms",
        serde_json::json!("net30"),
        1,
        3600,
    );
    let newer = semantic(
        "customer:tc_boiler",
        "payment_terms",
        serde_json::json!("net15"),
        0,
        0,
    );
    engine.create_semantic(&older).await.unwrap();
    engine.create_semantic(&newer).await.unwrap();

    let conflict = MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsMemory,
        conflict_data: serde_json::json!({
            "existing_memory_id": older.memory_id,
            "new_memory_id": newer.memory_id,
        }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    };
    engine.create_conflict(&conflict).await.unwrap();

    let resolver = ConflictResolver::new(engine.clone(), Arc::new(HeuristicRegistry::default()));
    let resolved = resolver.resolve(&conflict).await.unwrap();

    assert_eq!(
        resolved.resolution_strategy,
        Some(ResolutionStrategy::TrustRecent)
    );
    let outcome = resolved.resolution_outcome.unwrap();
    assert_eq!(outcome.winner_id, newer.memory_id);
    assert_eq!(outcome.loser_id, older.memory_id);

    let loser = engine.get_semantic(&older.memory_id).await.unwrap().unwrap();
    assert_eq!(loser.status, MemoryStatus::Superseded);
    assert_eq!(
        loser.superseded_by_memory_id.as_deref(),
        Some(newer.memory_id.as_str())
    );
    // The winner is unchanged.
    let winner = engine.get_semantic(&newer.memory_id).await.unwrap().unwrap();
    assert_eq!(winner.status, MemoryStatus::Active);
}

#[tokio::test]
async fn heavy_reinforcement_wins_under_trust_reinforced() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let proven = semantic(
        "customer:kai_media",
        "prefers_delivery_day",
        serde_json::json!({"day": "friday"}),
        5,
        3600,
    );
    let fresh = semantic(
        "customer:kai_media",
        "prefers_delivery_day",
        serde_json::json!({"day": "monday"}),
        0,
        0,
    );
    engine.create_semantic(&proven).await.unwrap();
    engine.create_semantic(&fresh).await.unwrap();

    let conflict = MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsMemory,
        conflict_data: serde_json::json!({
            "existing_memory_id": proven.memory_id,
            "new_memory_id": fresh.memory_id,
        }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    };
    engine.create_conflict(&conflict).await.unwrap();

    let resolver = ConflictResolver::new(engine.clone(), Arc::new(HeuristicRegistry::default()));
    let resolved = resolver.resolve(&conflict).await.unwrap();

    assert_eq!(
        resolved.resolution_strategy,
        Some(ResolutionStrategy::TrustReinforced)
    );
    let loser = engine.get_semantic(&fresh.memory_id).await.unwrap().unwrap();
    assert_eq!(loser.status, MemoryStatus::Superseded);
}

#[tokio::test]
async fn double_resolution_is_rejected() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let memory = semantic("so:SO-1001", "status", serde_json::json!("fulfilled"), 0, 0);
    engine.create_semantic(&memory).await.unwrap();

    let conflict = MemoryConflict {
        conflict_id: uuid::Uuid::new_v4().to_string(),
        conflict_type: ConflictType::MemoryVsDb,
        conflict_data: serde_json::json!({ "memory_id": memory.memory_id }),
        resolution_strategy: None,
        resolution_outcome: None,
        detected_at: Utc::now(),
        resolved_at: None,
    };
    engine.create_conflict(&conflict).await.unwrap();

    let resolver = ConflictResolver::new(engine.clone(), Arc::new(HeuristicRegistry::default()));
    let resolved = resolver.resolve(&conflict).await.unwrap();
    assert!(resolver.resolve(&resolved).await.is_err());
}

#[tokio::test]
async fn consolidation_boosts_restated_facts_and_attenuates_episodes() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let entity_id = "customer:kai_media";

    let mut friday = semantic(
        entity_id,
        "prefers_delivery_day",
        serde_json::json!({"day": "friday"}),
        2,
        0,
    );
    friday.confidence = 0.85;
    engine.create_semantic(&friday).await.unwrap();

    for i in 0..12 {
        seed_episode(&engine, entity_id, i).await;
    }

    let response = format!(
        r#"{{"summary": "Kai Media consistently prefers Friday deliveries.",
            "key_facts": [{{"fact": "Prefers Friday deliveries",
                            "memory_ids": ["{}"], "confidence": 0.9}}]}}"#,
        friday.memory_id
    );
    let consolidator = Consolidator::new(
        engine.clone(),
        Arc::new(ScriptedLlm::new(vec![&response])),
        Arc::new(HashEmbedder::new(FIXTURE_DIMENSIONS)),
        Arc::new(HeuristicRegistry::default()),
        Duration::from_secs(10),
    );

    let summary = consolidator
        .maybe_consolidate_entity("u1", entity_id)
        .await
        .unwrap()
        .expect("threshold crossed");

    assert_eq!(summary.scope_type, SummaryScope::Entity);
    assert_eq!(summary.scope_identifier, entity_id);
    assert_eq!(summary.source_data.episodic_ids.len(), 12);

    let stored = engine
        .summary_by_scope(SummaryScope::Entity, entity_id, "u1")
        .await
        .unwrap();
    assert!(stored.is_some());

    // Confirmed fact: +0.05 clamped; reinforcement count untouched.
    let boosted = engine.get_semantic(&friday.memory_id).await.unwrap().unwrap();
    assert!((boosted.confidence - 0.90).abs() < 1e-9);
    assert_eq!(boosted.reinforcement_count, 2);

    // Episodes attenuate below retrieval cutoffs but are not deleted.
    let episode = engine.get_episodic("ep-0").await.unwrap().unwrap();
    assert!((episode.importance - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn consolidation_below_threshold_is_a_no_op() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let entity_id = "customer:kai_media";
    for i in 0..2 {
        seed_episode(&engine, entity_id, i).await;
    }
    let consolidator = Consolidator::new(
        engine.clone(),
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(HashEmbedder::new(FIXTURE_DIMENSIONS)),
        Arc::new(HeuristicRegistry::default()),
        Duration::from_secs(10),
    );
    let result = consolidator
        .maybe_consolidate_entity("u1", entity_id)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn llm_failure_falls_back_to_concatenation_without_boost() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let entity_id = "customer:kai_media";

    let mut friday = semantic(
        entity_id,
        "prefers_delivery_day",
        serde_json::json!({"day": "friday"}),
        2,
        0,
    );
    friday.confidence = 0.85;
    engine.create_semantic(&friday).await.unwrap();
    for i in 0..12 {
        seed_episode(&engine, entity_id, i).await;
    }

    let consolidator = Consolidator::new(
        engine.clone(),
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(HashEmbedder::new(FIXTURE_DIMENSIONS)),
        Arc::new(HeuristicRegistry::default()),
        Duration::from_secs(10),
    );
    let summary = consolidator
        .maybe_consolidate_entity("u1", entity_id)
        .await
        .unwrap()
        .expect("threshold crossed");

    // Fallback text comes from episode summaries; no boost applied.
    assert!(summary.summary_text.contains("Friday deliveries"));
    let unboosted = engine.get_semantic(&friday.memory_id).await.unwrap().unwrap();
    assert!((unboosted.confidence - 0.85).abs() < 1e-9);
}

#[tokio::test]
async fn confirm_and_reject_walk_the_state_machine() {
    let engine: Arc<StorageEngine> = Arc::new(fixture_engine());
    let store: Arc<dyn MemoryStore> = engine.clone();

    let mut aging = semantic("customer:kai_media", "payment_terms", serde_json::json!("net15"), 0, 0);
    aging.status = MemoryStatus::Aging;
    engine.create_semantic(&aging).await.unwrap();

    let confirmed = validation::confirm_memory(&store, &aging.memory_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, MemoryStatus::Active);

    let rejected = validation::reject_memory(&store, &aging.memory_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rejected.status, MemoryStatus::Invalidated);

    // Terminal states stay put.
    let still = validation::confirm_memory(&store, &aging.memory_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still.status, MemoryStatus::Invalidated);
}

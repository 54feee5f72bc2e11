//! End-to-end turns over the seeded fixture domain: cold-start grounding,
//! preference recall with augmentation, both conflict paths, PII handling,
//! and the idempotence / provenance properties.

use std::sync::Arc;

use chrono::Utc;

use engram_core::config::{HeuristicRegistry, LlmConfig};
use engram_core::models::*;
use engram_core::traits::{
    DomainDb, Embedder, EntityStore, EventLog, LanguageModel, MemoryStore,
};
use engram_session::{SessionPipeline, TurnOutcome, TurnRequest};
use engram_storage::StorageEngine;
use test_fixtures::{
    fixture_engine, seed_ontology, FixtureDomainDb, HashEmbedder, ScriptedLlm,
    FIXTURE_DIMENSIONS,
};

struct Harness {
    engine: Arc<StorageEngine>,
    domain: Arc<FixtureDomainDb>,
    pipeline: SessionPipeline,
}

async fn harness(llm: ScriptedLlm) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let engine = Arc::new(fixture_engine());
    seed_ontology(&engine).await.unwrap();
    let domain = Arc::new(FixtureDomainDb::seeded());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(FIXTURE_DIMENSIONS));
    let events: Arc<dyn EventLog> = engine.clone();
    let entities: Arc<dyn EntityStore> = engine.clone();
    let memories: Arc<dyn MemoryStore> = engine.clone();
    let llm: Arc<dyn LanguageModel> = Arc::new(llm);
    let domain_db: Arc<dyn DomainDb> = domain.clone();
    let pipeline = SessionPipeline::new(
        events,
        entities,
        memories,
        domain_db,
        llm,
        embedder,
        Arc::new(HeuristicRegistry::default()),
        &LlmConfig::default(),
    );
    Harness {
        engine,
        domain,
        pipeline,
    }
}

async fn embed(text: &str) -> Vec<f32> {
    HashEmbedder::new(FIXTURE_DIMENSIONS).embed(text).await.unwrap()
}

fn entity(id: &str, name: &str, external: Option<(&str, &str)>) -> CanonicalEntity {
    let now = Utc::now();
    CanonicalEntity {
        entity_id: id.to_string(),
        entity_type: id.split(':').next().unwrap().to_string(),
        canonical_name: name.to_string(),
        properties: serde_json::json!({}),
        external_ref: external.map(|(table, key)| ExternalRef {
            table: table.to_string(),
            primary_key: key.to_string(),
        }),
        created_by_user_id: None,
        created_at: now,
        updated_at: now,
    }
}

async fn seed_semantic(
    engine: &Arc<StorageEngine>,
    subject: &str,
    predicate: &str,
    value: serde_json::Value,
    original_text: &str,
    confidence: f64,
    reinforcement_count: u32,
) -> SemanticMemory {
    let now = Utc::now();
    let memory = SemanticMemory {
        memory_id: uuid::Uuid::new_v4().to_string(),
        user_id: "u1".to_string(),
        subject_entity_id: subject.to_string(),
        predicate: predicate.to_string(),
        predicate_type: PredicateType::Preference,
        object_value: value,
        original_text: original_text.to_string(),
        source_text: String::new(),
        related_entities: vec![subject.to_string()],
        embedding: embed(original_text).await,
        confidence,
        confidence_factors: ConfidenceFactors::default(),
        reinforcement_count,
        status: MemoryStatus::Active,
        last_validated_at: now,
        extracted_from_event_id: None,
        source_memory_id: None,
        superseded_by_memory_id: None,
        created_at: now,
        updated_at: now,
    };
    engine.create_semantic(&memory).await.unwrap();
    memory
}

fn completed(outcome: TurnOutcome) -> (ChatEvent, ReplyContext) {
    match outcome {
        TurnOutcome::Completed { event, context } => (event, context),
        other => panic!("expected completed turn, got {other:?}"),
    }
}

// Scenario 1: cold-start grounding. Live DB facts only, no memories, and an
// episodic memory referencing the turn.
#[tokio::test]
async fn cold_start_grounds_in_domain_facts() {
    let h = harness(ScriptedLlm::always("[]")).await;
    let request = TurnRequest::new(
        "u1",
        "s1",
        "What is the status of TC Boiler's order?",
        vec!["TC Boiler"],
    );
    let (event, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    let so_fact = context
        .domain_facts
        .iter()
        .find(|f| f.source_rows.contains(&"SO-2002".to_string()))
        .expect("SO-2002 in domain facts");
    assert_eq!(
        so_fact.content.get("status"),
        Some(&serde_json::json!("in_fulfillment"))
    );

    assert!(context.memories.is_empty());
    assert!(context.conflicts_detected.is_empty());

    let episodes = h.engine.episodic_by_session("s1", 10).await.unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].source_event_id, event.event_id);
    assert!(episodes[0].entities.contains(&"customer:tc_boiler".to_string()));
}

// Scenario 2: preference recall plus domain augmentation, both cited.
#[tokio::test]
async fn preference_recall_with_domain_augmentation() {
    let h = harness(ScriptedLlm::always("[]")).await;
    h.engine
        .create(&entity(
            "customer:kai_media",
            "Kai Media",
            Some(("customers", "C-1002")),
        ))
        .await
        .unwrap();
    let preference = seed_semantic(
        &h.engine,
        "customer:kai_media",
        "prefers_delivery_day",
        serde_json::json!({"day": "friday"}),
        "Kai Media prefers Friday deliveries",
        0.85,
        0,
    )
    .await;

    let request = TurnRequest::new(
        "u1",
        "s1",
        "Draft an email about Kai Media's unpaid invoice and the delivery preference.",
        vec!["Kai Media"],
    );
    let (_, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    let invoice_fact = context
        .domain_facts
        .iter()
        .find(|f| f.source_rows.contains(&"INV-1009".to_string()))
        .expect("INV-1009 in domain facts");
    assert_eq!(invoice_fact.source_table, "invoices");

    let recalled = context
        .memories
        .iter()
        .find(|m| m.memory_id == preference.memory_id)
        .expect("Friday preference retrieved");
    assert!(recalled.score >= 0.5, "score was {}", recalled.score);
    assert!(context
        .provenance
        .iter()
        .any(|p| p.memory_id == preference.memory_id));
}

// Scenario 3: memory-vs-DB conflict resolves trust_db and invalidates.
#[tokio::test]
async fn stale_memory_loses_to_the_domain_db() {
    let h = harness(ScriptedLlm::always("[]")).await;
    h.engine
        .create(&entity(
            "so:SO-1001",
            "SO-1001",
            Some(("sales_orders", "SO-1001")),
        ))
        .await
        .unwrap();
    let stale = seed_semantic(
        &h.engine,
        "so:SO-1001",
        "status",
        serde_json::json!("fulfilled"),
        "SO-1001 has been fulfilled",
        0.7,
        0,
    )
    .await;

    let request = TurnRequest::new("u1", "s1", "Is SO-1001 complete?", vec!["SO-1001"]);
    let (_, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    assert_eq!(context.conflicts_detected.len(), 1);
    let detected = &context.conflicts_detected[0];
    assert_eq!(detected.conflict_type, ConflictType::MemoryVsDb);
    assert_eq!(detected.resolution_strategy, Some(ResolutionStrategy::TrustDb));

    let after = h.engine.get_semantic(&stale.memory_id).await.unwrap().unwrap();
    assert_eq!(after.status, MemoryStatus::Invalidated);

    let so_fact = context
        .domain_facts
        .iter()
        .find(|f| f.source_rows.contains(&"SO-1001".to_string()))
        .expect("SO-1001 in domain facts");
    assert_eq!(
        so_fact.content.get("status"),
        Some(&serde_json::json!("in_fulfillment"))
    );
}

// Scenario 4: conflicting observation supersedes under trust_recent.
#[tokio::test]
async fn new_observation_supersedes_the_old() {
    let triple = r#"[{"subject_entity_id": "customer:tc_boiler",
        "predicate": "payment_terms", "predicate_type": "attribute",
        "object_value": "NET15", "confidence_hint": 0.9,
        "original_text": "TC Boiler uses NET15 payment terms"}]"#;
    let h = harness(ScriptedLlm::new(vec![triple])).await;
    // No external ref: the DB has no say in this one.
    h.engine
        .create(&entity("customer:tc_boiler", "TC Boiler", None))
        .await
        .unwrap();
    let old = seed_semantic(
        &h.engine,
        "customer:tc_boiler",
        "payment_terms",
        serde_json::json!("net30"),
        "TC Boiler pays on NET30 terms",
        0.8,
        1,
    )
    .await;

    let request = TurnRequest::new("u1", "s1", "TC Boiler uses NET15 now.", vec!["TC Boiler"]);
    let (_, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    assert_eq!(context.conflicts_detected.len(), 1);
    assert_eq!(
        context.conflicts_detected[0].resolution_strategy,
        Some(ResolutionStrategy::TrustRecent)
    );

    let superseded = h.engine.get_semantic(&old.memory_id).await.unwrap().unwrap();
    assert_eq!(superseded.status, MemoryStatus::Superseded);
    let winner_id = superseded.superseded_by_memory_id.expect("points at winner");

    let winner = h.engine.get_semantic(&winner_id).await.unwrap().unwrap();
    assert_eq!(winner.object_value, serde_json::json!("net15"));
    assert_eq!(winner.status, MemoryStatus::Active);
}

// Ingest idempotence: the same logical turn lands exactly once.
#[tokio::test]
async fn duplicate_ingest_returns_the_same_event() {
    let h = harness(ScriptedLlm::always("[]")).await;
    let at = Utc::now();
    let (first, _) = h
        .pipeline
        .ingest("u1", "s1", ChatRole::User, "hello", serde_json::json!({}), Some(at))
        .await
        .unwrap();
    let (second, _) = h
        .pipeline
        .ingest("u1", "s1", ChatRole::User, "hello", serde_json::json!({}), Some(at))
        .await
        .unwrap();
    assert_eq!(first.event_id, second.event_id);
}

// PII never reaches storage; a policy memory records the redaction.
#[tokio::test]
async fn pii_is_redacted_and_recorded() {
    let h = harness(ScriptedLlm::always("[]")).await;
    let request = TurnRequest::new(
        "u1",
        "s1",
        "My SSN is 123-45-6789, please update my file",
        vec![],
    );
    let (event, _) = completed(h.pipeline.run_turn(&request).await.unwrap());

    assert!(event.content.contains("[REDACTED-SSN]"));
    assert!(!event.content.contains("123-45-6789"));

    let policies = h
        .engine
        .semantic_by_subject_predicate("user:u1", "pii_redaction", "u1")
        .await
        .unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].predicate_type, PredicateType::Policy);
}

// Provenance mirrors exactly the memories shown — no phantom citations.
#[tokio::test]
async fn provenance_matches_shown_memories_exactly() {
    let h = harness(ScriptedLlm::always("[]")).await;
    h.engine
        .create(&entity(
            "customer:kai_media",
            "Kai Media",
            Some(("customers", "C-1002")),
        ))
        .await
        .unwrap();
    for (predicate, text) in [
        ("prefers_delivery_day", "Kai Media prefers Friday deliveries"),
        ("requires_po_number", "Kai Media requires a PO number on invoices"),
    ] {
        seed_semantic(
            &h.engine,
            "customer:kai_media",
            predicate,
            serde_json::json!("x"),
            text,
            0.8,
            0,
        )
        .await;
    }

    let request = TurnRequest::new("u1", "s1", "Anything I should know about Kai Media?", vec!["Kai Media"]);
    let (_, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    let shown: Vec<&str> = context.memories.iter().map(|m| m.memory_id.as_str()).collect();
    let cited: Vec<&str> = context.provenance.iter().map(|p| p.memory_id.as_str()).collect();
    assert_eq!(shown, cited);
    assert!(!shown.is_empty());
}

// Ambiguous mentions halt the turn with candidates.
#[tokio::test]
async fn ambiguity_surfaces_for_disambiguation() {
    let h = harness(ScriptedLlm::always("[]")).await;
    h.engine
        .create(&entity("customer:kai_media", "Kai Media", None))
        .await
        .unwrap();
    h.engine
        .create(&entity("customer:kay_medias", "Kay Medias", None))
        .await
        .unwrap();

    let request = TurnRequest::new("u1", "s1", "Call Kay Media today", vec!["Kay Media"]);
    match h.pipeline.run_turn(&request).await.unwrap() {
        TurnOutcome::NeedsDisambiguation { candidates, .. } => {
            assert!(candidates.len() >= 2);
        }
        other => panic!("expected disambiguation, got {other:?}"),
    }
}

// The provenance walk reaches the originating chat event.
#[tokio::test]
async fn explain_walks_back_to_the_event() {
    let triple = r#"[{"subject_entity_id": "customer:tc_boiler",
        "predicate": "payment_terms", "predicate_type": "attribute",
        "object_value": "NET15", "confidence_hint": 0.9,
        "original_text": "TC Boiler uses NET15 payment terms"}]"#;
    let h = harness(ScriptedLlm::new(vec![triple])).await;
    h.engine
        .create(&entity("customer:tc_boiler", "TC Boiler", None))
        .await
        .unwrap();

    let request = TurnRequest::new("u1", "s1", "TC Boiler uses NET15 now.", vec!["TC Boiler"]);
    let (event, _) = completed(h.pipeline.run_turn(&request).await.unwrap());

    let created = h
        .engine
        .semantic_by_subject_predicate("customer:tc_boiler", "payment_terms", "u1")
        .await
        .unwrap();
    assert_eq!(created.len(), 1);

    let steps = h.pipeline.explain(&created[0].memory_id).await.unwrap();
    assert_eq!(steps.len(), 1);
    let source = steps[0].source_event.as_ref().expect("walks to event");
    assert_eq!(source.event_id, event.event_id);
}

// Task facts carry SLA risk flags.
#[tokio::test]
async fn overdue_tasks_are_flagged() {
    let h = harness(ScriptedLlm::always("[]")).await;
    let request = TurnRequest::new(
        "u1",
        "s1",
        "Any tasks to follow up for TC Boiler?",
        vec!["TC Boiler"],
    );
    let (_, context) = completed(h.pipeline.run_turn(&request).await.unwrap());

    // TASK-1 is 10 days old against a 7-day SLA.
    let task = context
        .domain_facts
        .iter()
        .find(|f| f.source_rows.contains(&"TASK-1".to_string()))
        .expect("TASK-1 in domain facts");
    let risk = task.risk.as_ref().expect("risk computed");
    assert_eq!(risk.risk_level, RiskLevel::High);
    assert_eq!(risk.days_overdue, 3);

    // The suggested patch is a string, never executed.
    let patch = h.pipeline.suggest_task_completion("TASK-1");
    assert_eq!(patch, "UPDATE tasks SET status = 'done' WHERE task_id = 'TASK-1';");
    let rows = h
        .domain
        .execute("SELECT status FROM tasks WHERE task_id = ?1", &[serde_json::json!("TASK-1")])
        .await
        .unwrap();
    assert_eq!(rows[0].get("status"), Some(&serde_json::json!("open")));
}

//! Resolver integration over the five stages, including alias learning and
//! the zero-LLM determinism guarantee.

use std::sync::Arc;

use chrono::Utc;

use engram_core::config::HeuristicRegistry;
use engram_core::errors::ResolutionError;
use engram_core::models::*;
use engram_core::traits::{DomainDb, EntityStore, LanguageModel};
use engram_core::EngramError;
use engram_resolve::EntityResolver;
use engram_storage::StorageEngine;
use test_fixtures::{fixture_engine, FixtureDomainDb, ScriptedLlm};

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

fn resolver(
    engine: &Arc<StorageEngine>,
    llm: Arc<dyn LanguageModel>,
    domain: Arc<dyn DomainDb>,
) -> EntityResolver {
    EntityResolver::new(
        engine.clone(),
        llm,
        domain,
        Arc::new(HeuristicRegistry::default()),
    )
}

fn ctx(user_id: &str) -> ResolutionContext {
    ResolutionContext {
        user_id: user_id.to_string(),
        session_id: "s1".to_string(),
        recent_entities: Vec::new(),
        conversation_text: String::new(),
    }
}

#[tokio::test]
async fn exact_match_wins_with_full_confidence() {
    let engine = Arc::new(fixture_engine());
    engine.create(&entity("customer:kai_media", "Kai Media")).await.unwrap();
    let resolver = resolver(
        &engine,
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(FixtureDomainDb::seeded()),
    );

    let result = resolver.resolve("kai media", &ctx("u1")).await.unwrap();
    assert_eq!(result.entity_id, "customer:kai_media");
    assert_eq!(result.method, ResolutionMethod::Exact);
    assert_eq!(result.confidence, 1.0);
}

#[tokio::test]
async fn fuzzy_match_learns_alias_then_resolves_deterministically() {
    let engine = Arc::new(fixture_engine());
    engine.create(&entity("customer:kai_media", "Kai Media")).await.unwrap();
    let llm = Arc::new(ScriptedLlm::refusing());
    let resolver = resolver(&engine, llm.clone(), Arc::new(FixtureDomainDb::seeded()));

    // First sighting: fuzzy stage accepts and learns a user-scoped alias.
    let first = resolver.resolve("Kay Media", &ctx("u1")).await.unwrap();
    assert_eq!(first.entity_id, "customer:kai_media");
    assert_eq!(first.method, ResolutionMethod::Fuzzy);
    assert!(first.confidence >= 0.85);

    let (alias, _) = engine
        .find_by_alias("Kay Media", Some("u1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alias.source, AliasSource::FuzzyLearned);
    assert_eq!(alias.user_id.as_deref(), Some("u1"));

    // Second identical mention: stage 2, same answer, still zero LLM calls.
    let second = resolver.resolve("Kay Media", &ctx("u1")).await.unwrap();
    assert_eq!(second.entity_id, "customer:kai_media");
    assert_eq!(second.method, ResolutionMethod::Alias);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn near_ties_surface_as_ambiguity() {
    let engine = Arc::new(fixture_engine());
    engine.create(&entity("customer:kai_media", "Kai Media")).await.unwrap();
    engine.create(&entity("customer:kay_medias", "Kay Medias")).await.unwrap();
    let resolver = resolver(
        &engine,
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(FixtureDomainDb::seeded()),
    );

    let result = resolver.resolve("Kay Media", &ctx("u1")).await;
    match result {
        Err(EngramError::Resolution(ResolutionError::AmbiguousEntity {
            candidates, ..
        })) => {
            assert!(candidates.len() >= 2);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn coreference_resolves_pronouns_via_llm() {
    let engine = Arc::new(fixture_engine());
    engine.create(&entity("customer:kai_media", "Kai Media")).await.unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec!["customer:kai_media"]));
    let resolver = resolver(&engine, llm.clone(), Arc::new(FixtureDomainDb::seeded()));

    let mut context = ctx("u1");
    context.recent_entities = vec!["customer:kai_media".to_string()];
    context.conversation_text = "user: tell me about Kai Media".to_string();

    let result = resolver.resolve("they", &context).await.unwrap();
    assert_eq!(result.entity_id, "customer:kai_media");
    assert_eq!(result.method, ResolutionMethod::Coreference);
    assert_eq!(result.confidence, 0.75);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn coreference_failure_degrades_to_not_found() {
    let engine = Arc::new(fixture_engine());
    let resolver = resolver(
        &engine,
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(FixtureDomainDb::seeded()),
    );
    let mut context = ctx("u1");
    context.recent_entities = vec!["customer:kai_media".to_string()];

    let result = resolver.resolve("they", &context).await;
    assert!(matches!(
        result,
        Err(EngramError::Resolution(ResolutionError::EntityNotFound { .. }))
    ));
}

#[tokio::test]
async fn document_numbers_lazily_create_domain_entities() {
    let engine = Arc::new(fixture_engine());
    let llm = Arc::new(ScriptedLlm::refusing());
    let resolver = resolver(&engine, llm.clone(), Arc::new(FixtureDomainDb::seeded()));

    let result = resolver.resolve("INV-1009", &ctx("u1")).await.unwrap();
    assert_eq!(result.entity_id, "invoice:INV-1009");
    assert_eq!(result.method, ResolutionMethod::DomainDb);
    assert_eq!(result.confidence, 0.90);
    // Stage 5 requires zero LLM calls.
    assert_eq!(llm.call_count(), 0);

    let created = engine
        .lookup_by_external_ref("invoices", "INV-1009")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.entity_type, "invoice");
    assert_eq!(
        created.properties.get("status"),
        Some(&serde_json::json!("open"))
    );

    // A second resolution reuses the lazily created entity (now exact).
    let again = resolver.resolve("INV-1009", &ctx("u1")).await.unwrap();
    assert_eq!(again.entity_id, "invoice:INV-1009");
}

#[tokio::test]
async fn customer_names_probe_the_domain_db() {
    let engine = Arc::new(fixture_engine());
    let resolver = resolver(
        &engine,
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(FixtureDomainDb::seeded()),
    );

    let result = resolver.resolve("TC Boiler", &ctx("u1")).await.unwrap();
    assert_eq!(result.entity_id, "customer:tc_boiler");
    assert_eq!(result.method, ResolutionMethod::DomainDb);

    let created = engine.get_by_id("customer:tc_boiler").await.unwrap().unwrap();
    assert_eq!(
        created.external_ref.unwrap().primary_key,
        "C-1001"
    );
}

#[tokio::test]
async fn unknown_mentions_are_not_found() {
    let engine = Arc::new(fixture_engine());
    let resolver = resolver(
        &engine,
        Arc::new(ScriptedLlm::refusing()),
        Arc::new(FixtureDomainDb::seeded()),
    );
    let result = resolver.resolve("Nonexistent Corp", &ctx("u1")).await;
    assert!(matches!(
        result,
        Err(EngramError::Resolution(ResolutionError::EntityNotFound { .. }))
    ));
}

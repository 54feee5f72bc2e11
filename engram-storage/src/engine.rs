//! StorageEngine — owns the write connection and read pool, runs migrations,
//! and implements the `EntityStore`, `MemoryStore`, and `EventLog` traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use engram_core::config::StorageConfig;
use engram_core::errors::StorageError;
use engram_core::models::{
    AliasSource, CanonicalEntity, ChatEvent, EntityAlias, EpisodicMemory, MemoryConflict,
    MemorySummary, OntologyRelation, ProceduralMemory, SemanticMemory, SummaryScope,
};
use engram_core::traits::{EntityStore, EventLog, MemoryStore, SemanticFilter};
use engram_core::{EngramError, EngramResult};

use crate::migrations;
use crate::pool::{ReadPool, WriteConnection};
use crate::queries::{
    conflict_ops, config_ops, entity_ops, episodic_ops, event_ops, ontology_ops,
    procedural_ops, semantic_ops, summary_ops,
};

/// Key under which heuristic overrides are persisted in system_config.
pub const HEURISTICS_CONFIG_KEY: &str = "heuristics";

pub struct StorageEngine {
    writer: Arc<WriteConnection>,
    readers: Arc<ReadPool>,
    vector_dimension: usize,
}

impl StorageEngine {
    /// Open (or create) the database at the configured path and run all
    /// pending migrations.
    pub fn open(config: &StorageConfig) -> EngramResult<Self> {
        Self::open_uri(&config.db_path, config)
    }

    /// A private shared-cache in-memory database; used by tests and fixtures.
    pub fn open_in_memory(vector_dimension: usize) -> EngramResult<Self> {
        let uri = format!(
            "file:engram_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        let config = StorageConfig {
            db_path: uri.clone(),
            read_pool_size: 2,
            vector_dimension,
        };
        Self::open_uri(&uri, &config)
    }

    fn open_uri(uri: &str, config: &StorageConfig) -> EngramResult<Self> {
        let writer = Arc::new(WriteConnection::open(uri)?);
        writer.with_conn_sync(migrations::run_migrations)?;
        let readers = Arc::new(ReadPool::open(uri, config.read_pool_size)?);
        Ok(Self {
            writer,
            readers,
            vector_dimension: config.vector_dimension,
        })
    }

    pub fn writer(&self) -> &Arc<WriteConnection> {
        &self.writer
    }

    pub fn readers(&self) -> &Arc<ReadPool> {
        &self.readers
    }

    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    fn check_dimension(&self, embedding: &[f32]) -> EngramResult<()> {
        if embedding.len() != self.vector_dimension {
            return Err(EngramError::Storage(StorageError::DimensionMismatch {
                expected: self.vector_dimension,
                actual: embedding.len(),
            }));
        }
        Ok(())
    }

    /// Persist heuristic overrides (TOML) so a restart reloads the same table.
    pub async fn save_heuristics_toml(&self, toml_str: &str) -> EngramResult<()> {
        let value = toml_str.to_string();
        self.writer
            .with_conn(move |conn| config_ops::set(conn, HEURISTICS_CONFIG_KEY, &value))
            .await
    }

    pub async fn load_heuristics_toml(&self) -> EngramResult<Option<String>> {
        self.readers
            .with_conn(|conn| config_ops::get(conn, HEURISTICS_CONFIG_KEY))
            .await
    }
}

#[async_trait]
impl EventLog for StorageEngine {
    async fn append(&self, event: ChatEvent) -> EngramResult<ChatEvent> {
        self.writer
            .with_conn(move |conn| event_ops::append(conn, &event))
            .await
    }

    async fn get(&self, event_id: &str) -> EngramResult<Option<ChatEvent>> {
        let id = event_id.to_string();
        self.readers.with_conn(move |conn| event_ops::get(conn, &id)).await
    }

    async fn session_events(
        &self,
        session_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<ChatEvent>> {
        let sid = session_id.to_string();
        self.readers
            .with_conn(move |conn| event_ops::session_events(conn, &sid, limit))
            .await
    }
}

#[async_trait]
impl EntityStore for StorageEngine {
    async fn get_by_id(&self, entity_id: &str) -> EngramResult<Option<CanonicalEntity>> {
        let id = entity_id.to_string();
        self.readers
            .with_conn(move |conn| entity_ops::get_by_id(conn, &id))
            .await
    }

    async fn find_exact(&self, canonical_name: &str) -> EngramResult<Option<CanonicalEntity>> {
        let name = canonical_name.to_string();
        self.readers
            .with_conn(move |conn| entity_ops::find_exact(conn, &name))
            .await
    }

    async fn find_by_alias(
        &self,
        alias_text: &str,
        user_id: Option<&str>,
    ) -> EngramResult<Option<(EntityAlias, CanonicalEntity)>> {
        let text = alias_text.to_string();
        let uid = user_id.map(|s| s.to_string());
        self.readers
            .with_conn(move |conn| entity_ops::find_by_alias(conn, &text, uid.as_deref()))
            .await
    }

    async fn fuzzy_search(
        &self,
        text: &str,
        threshold: f64,
        limit: usize,
    ) -> EngramResult<Vec<(CanonicalEntity, f64)>> {
        let text = text.to_string();
        self.readers
            .with_conn(move |conn| entity_ops::fuzzy_search(conn, &text, threshold, limit))
            .await
    }

    async fn create(&self, entity: &CanonicalEntity) -> EngramResult<()> {
        let entity = entity.clone();
        self.writer
            .with_conn(move |conn| {
                if entity.external_ref.is_some() {
                    entity_ops::create_or_get_by_external_ref(conn, &entity).map(|_| ())
                } else {
                    entity_ops::create(conn, &entity)
                }
            })
            .await
    }

    async fn create_alias(
        &self,
        canonical_entity_id: &str,
        alias_text: &str,
        source: AliasSource,
        user_id: Option<&str>,
        confidence: f64,
        metadata: serde_json::Value,
    ) -> EngramResult<EntityAlias> {
        let now = Utc::now();
        let alias = EntityAlias {
            alias_id: uuid::Uuid::new_v4().to_string(),
            canonical_entity_id: canonical_entity_id.to_string(),
            alias_text: alias_text.to_string(),
            source,
            user_id: user_id.map(|s| s.to_string()),
            confidence,
            metadata,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .with_conn(move |conn| entity_ops::create_alias(conn, &alias))
            .await
    }

    async fn lookup_by_external_ref(
        &self,
        table: &str,
        primary_key: &str,
    ) -> EngramResult<Option<CanonicalEntity>> {
        let table = table.to_string();
        let key = primary_key.to_string();
        self.readers
            .with_conn(move |conn| entity_ops::lookup_by_external_ref(conn, &table, &key))
            .await
    }
}

#[async_trait]
impl MemoryStore for StorageEngine {
    async fn create_episodic(&self, memory: &EpisodicMemory) -> EngramResult<()> {
        self.check_dimension(&memory.embedding)?;
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| episodic_ops::create(conn, &memory))
            .await
    }

    async fn get_episodic(&self, memory_id: &str) -> EngramResult<Option<EpisodicMemory>> {
        let id = memory_id.to_string();
        self.readers
            .with_conn(move |conn| episodic_ops::get(conn, &id))
            .await
    }

    async fn episodic_by_entities(
        &self,
        entity_ids: &[String],
        user_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<EpisodicMemory>> {
        let ids = entity_ids.to_vec();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| episodic_ops::by_entities(conn, &ids, &uid, limit))
            .await
    }

    async fn episodic_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(EpisodicMemory, f64)>> {
        self.check_dimension(embedding)?;
        let emb = embedding.to_vec();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| episodic_ops::find_similar(conn, &emb, limit, &uid))
            .await
    }

    async fn episodic_by_session(
        &self,
        session_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<EpisodicMemory>> {
        let sid = session_id.to_string();
        self.readers
            .with_conn(move |conn| episodic_ops::by_session(conn, &sid, limit))
            .await
    }

    async fn update_episodic(&self, memory: &EpisodicMemory) -> EngramResult<()> {
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| episodic_ops::update(conn, &memory))
            .await
    }

    async fn create_semantic(&self, memory: &SemanticMemory) -> EngramResult<()> {
        self.check_dimension(&memory.embedding)?;
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| semantic_ops::create(conn, &memory))
            .await
    }

    async fn get_semantic(&self, memory_id: &str) -> EngramResult<Option<SemanticMemory>> {
        let id = memory_id.to_string();
        self.readers
            .with_conn(move |conn| semantic_ops::get(conn, &id))
            .await
    }

    async fn semantic_by_subject_predicate(
        &self,
        subject_entity_id: &str,
        predicate: &str,
        user_id: &str,
    ) -> EngramResult<Vec<SemanticMemory>> {
        let (s, p, u) = (
            subject_entity_id.to_string(),
            predicate.to_string(),
            user_id.to_string(),
        );
        self.readers
            .with_conn(move |conn| semantic_ops::by_subject_predicate(conn, &s, &p, &u))
            .await
    }

    async fn semantic_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &SemanticFilter,
    ) -> EngramResult<Vec<(SemanticMemory, f64)>> {
        self.check_dimension(embedding)?;
        let emb = embedding.to_vec();
        let filter = filter.clone();
        self.readers
            .with_conn(move |conn| semantic_ops::find_similar(conn, &emb, limit, &filter))
            .await
    }

    async fn semantic_by_entities(
        &self,
        entity_ids: &[String],
        user_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<SemanticMemory>> {
        let ids = entity_ids.to_vec();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| semantic_ops::by_entities(conn, &ids, &uid, limit))
            .await
    }

    async fn find_reinforcements(
        &self,
        subject_entity_id: &str,
        predicate: &str,
        exclude_id: &str,
    ) -> EngramResult<Vec<SemanticMemory>> {
        let (s, p, x) = (
            subject_entity_id.to_string(),
            predicate.to_string(),
            exclude_id.to_string(),
        );
        self.readers
            .with_conn(move |conn| semantic_ops::find_reinforcements(conn, &s, &p, &x))
            .await
    }

    async fn update_semantic(&self, memory: &SemanticMemory) -> EngramResult<bool> {
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| semantic_ops::update(conn, &memory))
            .await
    }

    async fn create_procedural(&self, memory: &ProceduralMemory) -> EngramResult<()> {
        self.check_dimension(&memory.embedding)?;
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| procedural_ops::create(conn, &memory))
            .await
    }

    async fn procedural_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(ProceduralMemory, f64)>> {
        self.check_dimension(embedding)?;
        let emb = embedding.to_vec();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| procedural_ops::find_similar(conn, &emb, limit, &uid))
            .await
    }

    async fn update_procedural(&self, memory: &ProceduralMemory) -> EngramResult<()> {
        let memory = memory.clone();
        self.writer
            .with_conn(move |conn| procedural_ops::update(conn, &memory))
            .await
    }

    async fn create_summary(&self, summary: &MemorySummary) -> EngramResult<()> {
        self.check_dimension(&summary.embedding)?;
        let summary = summary.clone();
        self.writer
            .with_conn(move |conn| summary_ops::create(conn, &summary))
            .await
    }

    async fn summary_by_scope(
        &self,
        scope_type: SummaryScope,
        scope_identifier: &str,
        user_id: &str,
    ) -> EngramResult<Option<MemorySummary>> {
        let scope = scope_identifier.to_string();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| summary_ops::by_scope(conn, scope_type, &scope, &uid))
            .await
    }

    async fn summary_similar(
        &self,
        embedding: &[f32],
        limit: usize,
        user_id: &str,
    ) -> EngramResult<Vec<(MemorySummary, f64)>> {
        self.check_dimension(embedding)?;
        let emb = embedding.to_vec();
        let uid = user_id.to_string();
        self.readers
            .with_conn(move |conn| summary_ops::find_similar(conn, &emb, limit, &uid))
            .await
    }

    async fn create_conflict(&self, conflict: &MemoryConflict) -> EngramResult<()> {
        let conflict = conflict.clone();
        self.writer
            .with_conn(move |conn| conflict_ops::create(conn, &conflict))
            .await
    }

    async fn update_conflict(&self, conflict: &MemoryConflict) -> EngramResult<()> {
        let conflict = conflict.clone();
        self.writer
            .with_conn(move |conn| conflict_ops::update(conn, &conflict))
            .await
    }

    async fn unresolved_conflicts(&self) -> EngramResult<Vec<MemoryConflict>> {
        self.readers.with_conn(conflict_ops::unresolved).await
    }

    async fn ontology_relations(&self) -> EngramResult<Vec<OntologyRelation>> {
        self.readers.with_conn(ontology_ops::all).await
    }

    async fn replace_ontology(&self, relations: &[OntologyRelation]) -> EngramResult<()> {
        let relations = relations.to_vec();
        self.writer
            .with_tx(move |conn| ontology_ops::replace(conn, &relations))
            .await
    }
}

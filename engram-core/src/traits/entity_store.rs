use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{AliasSource, CanonicalEntity, EntityAlias};

/// Persistence for canonical entities and their aliases.
///
/// All lookups that take a `user_id` consult user-scoped rows first and fall
/// back to global rows.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_by_id(&self, entity_id: &str) -> EngramResult<Option<CanonicalEntity>>;

    /// Case-insensitive exact match on `canonical_name`.
    async fn find_exact(&self, canonical_name: &str) -> EngramResult<Option<CanonicalEntity>>;

    /// Exact match on NFC-normalized alias text; user-scoped first, then global.
    async fn find_by_alias(
        &self,
        alias_text: &str,
        user_id: Option<&str>,
    ) -> EngramResult<Option<(EntityAlias, CanonicalEntity)>>;

    /// Trigram similarity over canonical names and aliases; results sorted
    /// descending, all with similarity ≥ `threshold`.
    async fn fuzzy_search(
        &self,
        text: &str,
        threshold: f64,
        limit: usize,
    ) -> EngramResult<Vec<(CanonicalEntity, f64)>>;

    async fn create(&self, entity: &CanonicalEntity) -> EngramResult<()>;

    /// Idempotent on `(alias_text, user_id)`; returns the stored alias.
    /// Rejects an alias that equals a different entity's canonical name.
    #[allow(clippy::too_many_arguments)]
    async fn create_alias(
        &self,
        canonical_entity_id: &str,
        alias_text: &str,
        source: AliasSource,
        user_id: Option<&str>,
        confidence: f64,
        metadata: serde_json::Value,
    ) -> EngramResult<EntityAlias>;

    /// For lazy creation from domain-DB hits.
    async fn lookup_by_external_ref(
        &self,
        table: &str,
        primary_key: &str,
    ) -> EngramResult<Option<CanonicalEntity>>;
}

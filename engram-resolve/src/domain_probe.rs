//! Stage 5: probe the domain DB by structured patterns and lazily create a
//! canonical entity pointing at the row. No LLM involvement.

use chrono::Utc;

use engram_core::domain::{display_column, primary_key_column};
use engram_core::ids::slugify;
use engram_core::models::{CanonicalEntity, ExternalRef};
use engram_core::traits::{DomainDb, DomainRow, EntityStore};
use engram_core::EngramResult;

use crate::mention::{match_document, DocumentPattern};

/// Confidence for a domain-DB hit.
pub const DOMAIN_DB_CONFIDENCE: f64 = 0.90;

/// Probe by document number first, then by customer name. On a hit the
/// canonical entity is created with `external_ref` (idempotent under races)
/// and the raw row cached in `properties`.
pub async fn probe(
    entities: &dyn EntityStore,
    domain: &dyn DomainDb,
    mention: &str,
    user_id: &str,
) -> EngramResult<Option<CanonicalEntity>> {
    if let Some(pattern) = match_document(mention) {
        let key = mention.trim().to_uppercase();
        if let Some(entity) = probe_document(entities, domain, pattern, &key, user_id).await? {
            return Ok(Some(entity));
        }
        return Ok(None);
    }
    probe_customer(entities, domain, mention, user_id).await
}

async fn probe_document(
    entities: &dyn EntityStore,
    domain: &dyn DomainDb,
    pattern: &DocumentPattern,
    key: &str,
    user_id: &str,
) -> EngramResult<Option<CanonicalEntity>> {
    if let Some(existing) = entities.lookup_by_external_ref(pattern.table, key).await? {
        return Ok(Some(existing));
    }

    let pk = primary_key_column(pattern.table).unwrap_or("id");
    let query = format!("SELECT * FROM {} WHERE {} = ?1", pattern.table, pk);
    let rows = domain
        .execute(&query, &[serde_json::Value::String(key.to_string())])
        .await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };

    // Document entities keep the document number as their slug.
    let entity = materialize(
        pattern.entity_type,
        &format!("{}:{}", pattern.entity_type, key),
        key,
        pattern.table,
        key,
        row,
        user_id,
    );
    entities.create(&entity).await?;
    entities
        .lookup_by_external_ref(pattern.table, key)
        .await?
        .map_or(Ok(Some(entity)), |stored| Ok(Some(stored)))
}

async fn probe_customer(
    entities: &dyn EntityStore,
    domain: &dyn DomainDb,
    mention: &str,
    user_id: &str,
) -> EngramResult<Option<CanonicalEntity>> {
    let rows = domain
        .execute(
            "SELECT * FROM customers WHERE LOWER(name) = LOWER(?1)",
            &[serde_json::Value::String(mention.trim().to_string())],
        )
        .await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };

    let pk_col = primary_key_column("customers").unwrap_or("customer_id");
    let key = row
        .get(pk_col)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if key.is_empty() {
        return Ok(None);
    }
    if let Some(existing) = entities.lookup_by_external_ref("customers", &key).await? {
        return Ok(Some(existing));
    }

    let display = display_column("customers").unwrap_or("name");
    let name = row
        .get(display)
        .and_then(|v| v.as_str())
        .unwrap_or(mention)
        .to_string();
    let entity = materialize(
        "customer",
        &format!("customer:{}", slugify(&name)),
        &name,
        "customers",
        &key,
        row,
        user_id,
    );
    entities.create(&entity).await?;
    entities
        .lookup_by_external_ref("customers", &key)
        .await?
        .map_or(Ok(Some(entity)), |stored| Ok(Some(stored)))
}

fn materialize(
    entity_type: &str,
    entity_id: &str,
    canonical_name: &str,
    table: &str,
    primary_key: &str,
    row: DomainRow,
    user_id: &str,
) -> CanonicalEntity {
    let now = Utc::now();
    CanonicalEntity {
        entity_id: entity_id.to_string(),
        entity_type: entity_type.to_string(),
        canonical_name: canonical_name.to_string(),
        properties: serde_json::Value::Object(row),
        external_ref: Some(ExternalRef {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
        }),
        created_by_user_id: Some(user_id.to_string()),
        created_at: now,
        updated_at: now,
    }
}

//! Canonical entity and alias persistence: exact, alias, fuzzy, and
//! external-ref lookup, plus idempotent alias learning.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use engram_core::errors::StorageError;
use engram_core::ids::fold_alias;
use engram_core::models::{AliasSource, CanonicalEntity, EntityAlias, ExternalRef};
use engram_core::{EngramError, EngramResult};

use crate::similarity::fuzzy_similarity;
use crate::to_storage_err;

use super::{enum_col, enum_str, json_col, to_json_string, ts};

const ENTITY_COLUMNS: &str = "entity_id, entity_type, canonical_name, properties, \
     external_table, external_key, created_by_user_id, created_at, updated_at";

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<CanonicalEntity> {
    let external_table: Option<String> = row.get(4)?;
    let external_key: Option<String> = row.get(5)?;
    let external_ref = match (external_table, external_key) {
        (Some(table), Some(primary_key)) => Some(ExternalRef { table, primary_key }),
        _ => None,
    };
    Ok(CanonicalEntity {
        entity_id: row.get(0)?,
        entity_type: row.get(1)?,
        canonical_name: row.get(2)?,
        properties: json_col(row, 3)?,
        external_ref,
        created_by_user_id: row.get(6)?,
        created_at: ts(row, 7)?,
        updated_at: ts(row, 8)?,
    })
}

const ALIAS_COLUMNS: &str = "alias_id, canonical_entity_id, alias_text, source, \
     user_scope, confidence, metadata, created_at, updated_at";

fn row_to_alias(row: &Row<'_>) -> rusqlite::Result<EntityAlias> {
    let user_scope: String = row.get(4)?;
    Ok(EntityAlias {
        alias_id: row.get(0)?,
        canonical_entity_id: row.get(1)?,
        alias_text: row.get(2)?,
        source: enum_col::<AliasSource>(row, 3)?,
        user_id: if user_scope.is_empty() {
            None
        } else {
            Some(user_scope)
        },
        confidence: row.get(5)?,
        metadata: json_col(row, 6)?,
        created_at: ts(row, 7)?,
        updated_at: ts(row, 8)?,
    })
}

pub fn get_by_id(conn: &Connection, entity_id: &str) -> EngramResult<Option<CanonicalEntity>> {
    conn.query_row(
        &format!("SELECT {ENTITY_COLUMNS} FROM canonical_entities WHERE entity_id = ?1"),
        params![entity_id],
        row_to_entity,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Case-insensitive exact match on canonical name.
pub fn find_exact(
    conn: &Connection,
    canonical_name: &str,
) -> EngramResult<Option<CanonicalEntity>> {
    conn.query_row(
        &format!(
            "SELECT {ENTITY_COLUMNS} FROM canonical_entities
             WHERE canonical_name_folded = ?1"
        ),
        params![fold_alias(canonical_name)],
        row_to_entity,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Exact alias match: user-scoped first, global fallback.
pub fn find_by_alias(
    conn: &Connection,
    alias_text: &str,
    user_id: Option<&str>,
) -> EngramResult<Option<(EntityAlias, CanonicalEntity)>> {
    let folded = fold_alias(alias_text);
    let mut scopes: Vec<String> = Vec::new();
    if let Some(uid) = user_id {
        scopes.push(uid.to_string());
    }
    scopes.push(String::new());

    for scope in scopes {
        let alias = conn
            .query_row(
                &format!(
                    "SELECT {ALIAS_COLUMNS} FROM entity_aliases
                     WHERE alias_text = ?1 AND user_scope = ?2"
                ),
                params![folded, scope],
                row_to_alias,
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;

        if let Some(alias) = alias {
            let entity = get_by_id(conn, &alias.canonical_entity_id)?.ok_or_else(|| {
                EngramError::Storage(StorageError::NotFound {
                    kind: "canonical_entity",
                    id: alias.canonical_entity_id.clone(),
                })
            })?;
            return Ok(Some((alias, entity)));
        }
    }
    Ok(None)
}

/// Fuzzy search across canonical names and alias texts. Scores each entity
/// by its best-matching name form, keeps scores ≥ `threshold`, sorted
/// descending (canonical name as deterministic tie-break).
pub fn fuzzy_search(
    conn: &Connection,
    text: &str,
    threshold: f64,
    limit: usize,
) -> EngramResult<Vec<(CanonicalEntity, f64)>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {ENTITY_COLUMNS} FROM canonical_entities"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let entities = stmt
        .query_map([], row_to_entity)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut best: HashMap<String, f64> = HashMap::new();
    for entity in &entities {
        let sim = fuzzy_similarity(text, &entity.canonical_name);
        if sim >= threshold {
            let slot = best.entry(entity.entity_id.clone()).or_insert(0.0);
            if sim > *slot {
                *slot = sim;
            }
        }
    }

    // Alias texts can outscore the canonical name (e.g. learned shorthands).
    let mut alias_stmt = conn
        .prepare("SELECT canonical_entity_id, alias_text FROM entity_aliases")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let aliases = alias_stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (entity_id, alias_text) in aliases {
        let sim = fuzzy_similarity(text, &alias_text);
        if sim >= threshold {
            let slot = best.entry(entity_id).or_insert(0.0);
            if sim > *slot {
                *slot = sim;
            }
        }
    }

    let by_id: HashMap<String, CanonicalEntity> = entities
        .into_iter()
        .map(|e| (e.entity_id.clone(), e))
        .collect();

    let mut results: Vec<(CanonicalEntity, f64)> = best
        .into_iter()
        .filter_map(|(id, sim)| by_id.get(&id).cloned().map(|e| (e, sim)))
        .collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.canonical_name.cmp(&b.0.canonical_name))
    });
    results.truncate(limit);
    Ok(results)
}

pub fn create(conn: &Connection, entity: &CanonicalEntity) -> EngramResult<()> {
    let (external_table, external_key) = match &entity.external_ref {
        Some(r) => (Some(r.table.as_str()), Some(r.primary_key.as_str())),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO canonical_entities (
            entity_id, entity_type, canonical_name, canonical_name_folded, properties,
            external_table, external_key, created_by_user_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entity.entity_id,
            entity.entity_type,
            entity.canonical_name,
            fold_alias(&entity.canonical_name),
            to_json_string(&entity.properties),
            external_table,
            external_key,
            entity.created_by_user_id,
            entity.created_at.to_rfc3339(),
            entity.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Lazy-creation race: the unique `(external_table, external_key)` index
/// rejects the second writer, which rereads instead.
pub fn create_or_get_by_external_ref(
    conn: &Connection,
    entity: &CanonicalEntity,
) -> EngramResult<CanonicalEntity> {
    match create(conn, entity) {
        Ok(()) => Ok(entity.clone()),
        Err(_) => {
            let external = entity.external_ref.as_ref().ok_or_else(|| {
                to_storage_err("create_or_get_by_external_ref without external_ref".into())
            })?;
            lookup_by_external_ref(conn, &external.table, &external.primary_key)?.ok_or_else(
                || {
                    EngramError::Storage(StorageError::NotFound {
                        kind: "canonical_entity",
                        id: entity.entity_id.clone(),
                    })
                },
            )
        }
    }
}

/// Idempotent alias creation. Rejects an alias equal to a *different*
/// entity's canonical name, which would re-introduce ambiguity.
pub fn create_alias(
    conn: &Connection,
    alias: &EntityAlias,
) -> EngramResult<EntityAlias> {
    let folded = fold_alias(&alias.alias_text);

    let shadowed: Option<String> = conn
        .query_row(
            "SELECT entity_id FROM canonical_entities
             WHERE canonical_name_folded = ?1 AND entity_id != ?2",
            params![folded, alias.canonical_entity_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    if let Some(entity_id) = shadowed {
        return Err(EngramError::Storage(StorageError::AliasShadowsCanonical {
            alias: alias.alias_text.clone(),
            entity_id,
        }));
    }

    let scope = alias.user_id.clone().unwrap_or_default();
    conn.execute(
        "INSERT INTO entity_aliases (
            alias_id, canonical_entity_id, alias_text, source, user_scope,
            confidence, metadata, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(alias_text, user_scope) DO NOTHING",
        params![
            alias.alias_id,
            alias.canonical_entity_id,
            folded,
            enum_str(&alias.source),
            scope,
            alias.confidence,
            to_json_string(&alias.metadata),
            alias.created_at.to_rfc3339(),
            alias.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    // Reread: either our row or the earlier winner of the unique key.
    let stored = conn
        .query_row(
            &format!(
                "SELECT {ALIAS_COLUMNS} FROM entity_aliases
                 WHERE alias_text = ?1 AND user_scope = ?2"
            ),
            params![folded, scope],
            row_to_alias,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(stored)
}

pub fn lookup_by_external_ref(
    conn: &Connection,
    table: &str,
    primary_key: &str,
) -> EngramResult<Option<CanonicalEntity>> {
    conn.query_row(
        &format!(
            "SELECT {ENTITY_COLUMNS} FROM canonical_entities
             WHERE external_table = ?1 AND external_key = ?2"
        ),
        params![table, primary_key],
        row_to_entity,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// `properties` is the only mutable field on a canonical entity.
pub fn update_properties(
    conn: &Connection,
    entity_id: &str,
    properties: &serde_json::Value,
) -> EngramResult<()> {
    conn.execute(
        "UPDATE canonical_entities
         SET properties = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE entity_id = ?1",
        params![entity_id, to_json_string(properties)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

//! Domain ontology declarations.

use rusqlite::{params, Connection, Row};

use engram_core::models::{JoinSpec, OntologyRelation};
use engram_core::EngramResult;

use crate::to_storage_err;

use super::{enum_col, enum_str};

fn row_to_relation(row: &Row<'_>) -> rusqlite::Result<OntologyRelation> {
    Ok(OntologyRelation {
        from_entity_type: row.get(0)?,
        to_entity_type: row.get(1)?,
        relation_type: row.get(2)?,
        join_spec: JoinSpec {
            from_table: row.get(3)?,
            from_field: row.get(4)?,
            to_table: row.get(5)?,
            to_field: row.get(6)?,
        },
        cardinality: enum_col(row, 7)?,
    })
}

pub fn all(conn: &Connection) -> EngramResult<Vec<OntologyRelation>> {
    let mut stmt = conn
        .prepare(
            "SELECT from_entity_type, to_entity_type, relation_type,
                    from_table, from_field, to_table, to_field, cardinality
             FROM domain_ontology",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let relations = stmt
        .query_map([], row_to_relation)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(relations)
}

/// Replace the whole declaration set in one transaction-scoped call.
pub fn replace(conn: &Connection, relations: &[OntologyRelation]) -> EngramResult<()> {
    conn.execute("DELETE FROM domain_ontology", [])
        .map_err(|e| to_storage_err(e.to_string()))?;
    for relation in relations {
        conn.execute(
            "INSERT INTO domain_ontology (
                from_entity_type, to_entity_type, relation_type,
                from_table, from_field, to_table, to_field, cardinality
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                relation.from_entity_type,
                relation.to_entity_type,
                relation.relation_type,
                relation.join_spec.from_table,
                relation.join_spec.from_field,
                relation.join_spec.to_table,
                relation.join_spec.to_field,
                enum_str(&relation.cardinality),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

//! Domain augmentation: live facts for each resolved entity, pulled through
//! the ontology graph toward the query's target tables, with SLA risk flags
//! on tasks.

use chrono::{DateTime, Utc};

use engram_core::config::Heuristics;
use engram_core::domain::{primary_key_column, type_for_table};
use engram_core::models::{CanonicalEntity, DomainFact, RiskLevel, TaskRisk};
use engram_core::traits::{DomainDb, DomainRow};
use engram_core::EngramResult;

use crate::classify;
use crate::ontology::{compile_join, OntologyGraph, MAX_HOPS};

/// All domain facts for one turn: each resolved entity's own row plus every
/// row reachable along an ontology path to a query-inferred target table.
pub async fn domain_facts(
    domain: &dyn DomainDb,
    graph: &OntologyGraph,
    query_text: &str,
    resolved: &[CanonicalEntity],
    heuristics: &Heuristics,
    now: DateTime<Utc>,
) -> EngramResult<Vec<DomainFact>> {
    let targets = classify::target_tables(query_text);
    let mut facts = Vec::new();

    for entity in resolved {
        let Some(external) = &entity.external_ref else {
            continue;
        };

        // The entity's own row is always a fact.
        if let Some(row) = fetch_row(domain, &external.table, &external.primary_key).await? {
            facts.push(make_fact(
                &entity.entity_id,
                &external.table,
                row,
                heuristics,
                now,
            ));
        }

        for target_table in &targets {
            if *target_table == external.table {
                continue;
            }
            let Some(target_type) = type_for_table(target_table) else {
                continue;
            };
            let Some(path) = graph.path(&entity.entity_type, target_type, MAX_HOPS) else {
                tracing::debug!(
                    target: "engram_retrieval",
                    from = %entity.entity_type,
                    to = target_type,
                    "no ontology path"
                );
                continue;
            };
            if path.is_empty() {
                continue;
            }
            let Some(query) = compile_join(&path) else {
                continue;
            };
            let rows = domain
                .execute(
                    &query,
                    &[serde_json::Value::String(external.primary_key.clone())],
                )
                .await?;
            for row in rows {
                facts.push(make_fact(
                    &entity.entity_id,
                    target_table,
                    row,
                    heuristics,
                    now,
                ));
            }
        }
    }

    tracing::debug!(target: "engram_retrieval", count = facts.len(), "domain facts assembled");
    Ok(facts)
}

async fn fetch_row(
    domain: &dyn DomainDb,
    table: &str,
    key: &str,
) -> EngramResult<Option<DomainRow>> {
    let Some(pk) = primary_key_column(table) else {
        return Ok(None);
    };
    let rows = domain
        .execute(
            &format!("SELECT * FROM {table} WHERE {pk} = ?1"),
            &[serde_json::Value::String(key.to_string())],
        )
        .await?;
    Ok(rows.into_iter().next())
}

fn make_fact(
    entity_id: &str,
    table: &str,
    row: DomainRow,
    heuristics: &Heuristics,
    now: DateTime<Utc>,
) -> DomainFact {
    let source_row = primary_key_column(table)
        .and_then(|pk| row.get(pk))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let fact_type = type_for_table(table).unwrap_or(table).to_string();
    let risk = if table == "tasks" {
        task_risk(&row, heuristics, now)
    } else {
        None
    };
    DomainFact {
        fact_type,
        entity_id: entity_id.to_string(),
        content: serde_json::Value::Object(row),
        source_table: table.to_string(),
        source_rows: vec![source_row],
        retrieved_at: now,
        risk,
    }
}

/// Risk flags per the task SLA: overdue is high; 80% of the SLA burned is
/// medium; otherwise low.
pub fn task_risk(row: &DomainRow, heuristics: &Heuristics, now: DateTime<Utc>) -> Option<TaskRisk> {
    let created_at = row
        .get("created_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))?;
    let age_days = (now - created_at).num_days();
    let sla = heuristics.tasks.sla_days;

    let (risk_level, days_overdue) = if age_days > sla {
        (RiskLevel::High, age_days - sla)
    } else if (age_days as f64) >= 0.8 * sla as f64 {
        (RiskLevel::Medium, 0)
    } else {
        (RiskLevel::Low, 0)
    };
    Some(TaskRisk {
        risk_level,
        age_days,
        days_overdue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_row(age_days: i64, now: DateTime<Utc>) -> DomainRow {
        let mut row = DomainRow::new();
        row.insert(
            "created_at".to_string(),
            serde_json::Value::String((now - Duration::days(age_days)).to_rfc3339()),
        );
        row
    }

    #[test]
    fn risk_tiers_follow_the_sla() {
        let h = Heuristics::default(); // sla_days = 7
        let now = Utc::now();

        let high = task_risk(&task_row(10, now), &h, now).unwrap();
        assert_eq!(high.risk_level, RiskLevel::High);
        assert_eq!(high.days_overdue, 3);

        let medium = task_risk(&task_row(6, now), &h, now).unwrap();
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.days_overdue, 0);

        let low = task_risk(&task_row(2, now), &h, now).unwrap();
        assert_eq!(low.risk_level, RiskLevel::Low);
    }

    #[test]
    fn missing_created_at_yields_no_risk() {
        let h = Heuristics::default();
        assert!(task_risk(&DomainRow::new(), &h, Utc::now()).is_none());
    }
}

//! Proactive notices: procedural memories near the query whose trigger
//! predicates match the turn's domain facts.

use chrono::{DateTime, Utc};

use engram_core::models::{DomainFact, ProactiveNotice, ProceduralMemory, TriggerOp, TriggerPredicate};

/// How many procedural memories to consider per turn.
pub const PROCEDURAL_TOP_N: usize = 5;

/// Evaluate one predicate against one fact's content.
pub fn predicate_matches(
    predicate: &TriggerPredicate,
    fact: &DomainFact,
    now: DateTime<Utc>,
) -> bool {
    let Some(field_value) = fact.content.get(&predicate.field) else {
        return false;
    };
    match predicate.op {
        TriggerOp::Equals => {
            field_eq(field_value, &predicate.value)
        }
        TriggerOp::Contains => match (field_value.as_str(), predicate.value.as_str()) {
            (Some(haystack), Some(needle)) => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        },
        TriggerOp::DaysUntil => {
            let Some(date) = field_value
                .as_str()
                .and_then(parse_date)
            else {
                return false;
            };
            let Some(threshold) = predicate.value.as_i64() else {
                return false;
            };
            let days = (date - now).num_days();
            days >= 0 && days <= threshold
        }
    }
}

fn field_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => a == b,
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    // Bare dates (e.g. invoice due dates) are taken as midnight UTC.
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Notices for every procedural memory whose predicates all match at least
/// one domain fact.
pub fn evaluate(
    procedural: &[(ProceduralMemory, f64)],
    facts: &[DomainFact],
    now: DateTime<Utc>,
) -> Vec<ProactiveNotice> {
    let mut notices = Vec::new();
    for (memory, similarity) in procedural.iter().take(PROCEDURAL_TOP_N) {
        let predicates = &memory.action_structure.predicates;
        if predicates.is_empty() {
            continue;
        }
        let all_match = predicates.iter().all(|p| {
            facts.iter().any(|f| predicate_matches(p, f, now))
        });
        if all_match {
            notices.push(ProactiveNotice {
                trigger_id: memory.memory_id.clone(),
                notice_text: memory.action_heuristic.clone(),
                priority: if *similarity > 0.8 { 1 } else { 2 },
            });
        }
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{ActionStructure, TriggerFeatures};

    fn fact(content: serde_json::Value) -> DomainFact {
        DomainFact {
            fact_type: "invoice".into(),
            entity_id: "invoice:INV-1009".into(),
            content,
            source_table: "invoices".into(),
            source_rows: vec!["INV-1009".into()],
            retrieved_at: Utc::now(),
            risk: None,
        }
    }

    fn procedural(predicates: Vec<TriggerPredicate>) -> ProceduralMemory {
        let now = Utc::now();
        ProceduralMemory {
            memory_id: "p1".into(),
            user_id: "u1".into(),
            trigger_pattern: "unpaid invoice discussed".into(),
            trigger_features: TriggerFeatures::default(),
            action_heuristic: "Offer to draft a payment reminder".into(),
            action_structure: ActionStructure {
                action_type: "suggest".into(),
                queries: vec![],
                predicates,
            },
            embedding: vec![],
            confidence: 0.8,
            observed_count: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn equals_predicate_fires_case_insensitively() {
        let p = TriggerPredicate {
            field: "status".into(),
            op: TriggerOp::Equals,
            value: serde_json::json!("OPEN"),
        };
        let f = fact(serde_json::json!({"status": "open"}));
        assert!(predicate_matches(&p, &f, Utc::now()));
    }

    #[test]
    fn days_until_fires_inside_window_only() {
        let now = Utc::now();
        let due = (now + chrono::Duration::days(5)).format("%Y-%m-%d").to_string();
        let p = TriggerPredicate {
            field: "due_date".into(),
            op: TriggerOp::DaysUntil,
            value: serde_json::json!(7),
        };
        assert!(predicate_matches(&p, &fact(serde_json::json!({"due_date": due})), now));

        let far = (now + chrono::Duration::days(30)).format("%Y-%m-%d").to_string();
        assert!(!predicate_matches(&p, &fact(serde_json::json!({"due_date": far})), now));
    }

    #[test]
    fn notice_requires_all_predicates() {
        let now = Utc::now();
        let facts = vec![fact(serde_json::json!({"status": "open", "amount": 1200}))];
        let fires = procedural(vec![TriggerPredicate {
            field: "status".into(),
            op: TriggerOp::Equals,
            value: serde_json::json!("open"),
        }]);
        let blocked = procedural(vec![
            TriggerPredicate {
                field: "status".into(),
                op: TriggerOp::Equals,
                value: serde_json::json!("open"),
            },
            TriggerPredicate {
                field: "status".into(),
                op: TriggerOp::Contains,
                value: serde_json::json!("paid"),
            },
        ]);
        let notices = evaluate(&[(fires, 0.9), (blocked, 0.9)], &facts, now);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].trigger_id, "p1");
        assert_eq!(notices[0].priority, 1);
    }
}

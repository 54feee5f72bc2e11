use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// SLA risk annotation for task facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRisk {
    pub risk_level: RiskLevel,
    pub age_days: i64,
    pub days_overdue: i64,
}

/// One row's worth of live domain truth, fetched at reply time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFact {
    pub fact_type: String,
    pub entity_id: String,
    /// Row fields, keyed by column name.
    pub content: serde_json::Value,
    pub source_table: String,
    pub source_rows: Vec<String>,
    pub retrieved_at: DateTime<Utc>,
    pub risk: Option<TaskRisk>,
}

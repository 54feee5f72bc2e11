//! Passive decay. Never stored; always computed on read. Decayed confidence
//! never raises stored confidence.

use chrono::{DateTime, Utc};

use engram_core::models::SemanticMemory;

/// Fractional days since `last_validated_at`, floored at zero (a validation
/// stamped in the future decays nothing).
pub fn days_since(last_validated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - last_validated_at).num_seconds();
    (seconds.max(0) as f64) / 86_400.0
}

/// `stored × exp(−days × decay_per_day)`.
pub fn effective_confidence_at(
    stored_confidence: f64,
    last_validated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    decay_per_day: f64,
) -> f64 {
    let days = days_since(last_validated_at, now);
    stored_confidence * (-days * decay_per_day).exp()
}

/// Convenience over a memory row.
pub fn effective_confidence(
    memory: &SemanticMemory,
    now: DateTime<Utc>,
    decay_per_day: f64,
) -> f64 {
    effective_confidence_at(memory.confidence, memory.last_validated_at, now, decay_per_day)
}

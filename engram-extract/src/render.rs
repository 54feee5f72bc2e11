//! Natural-language rendering of triples. Embeddings live in this space,
//! not over the raw structured triple.

use serde_json::Value;

/// Flatten an object value into readable text.
pub fn object_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "unknown".to_string(),
        Value::Array(items) => items
            .iter()
            .map(object_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .values()
            .map(object_text)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// "Kai Media prefers Friday deliveries"-style rendering when the extractor
/// did not supply its own restatement.
pub fn render_triple(subject_name: &str, predicate: &str, object_value: &Value) -> String {
    let predicate_words = predicate.replace('_', " ");
    format!(
        "{} {} {}",
        subject_name,
        predicate_words,
        object_text(object_value)
    )
}

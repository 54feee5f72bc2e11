//! Object-value normalization and equivalence. Enum-like string tokens are
//! lowercased; records keep their structure with leaf strings folded.

use serde_json::Value;

/// Normalize an object value for storage and comparison.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}

/// Equivalence under normalization; the conflict probe's comparison.
pub fn values_equivalent(a: &Value, b: &Value) -> bool {
    normalize_value(a) == normalize_value(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_fold_case_and_whitespace() {
        assert!(values_equivalent(&json!("NET30"), &json!(" net30 ")));
        assert!(!values_equivalent(&json!("NET30"), &json!("NET15")));
    }

    #[test]
    fn records_compare_structurally() {
        assert!(values_equivalent(
            &json!({"day": "Friday"}),
            &json!({"day": "friday"})
        ));
        assert!(!values_equivalent(
            &json!({"day": "friday"}),
            &json!({"day": "monday"})
        ));
    }

    #[test]
    fn numbers_stay_exact() {
        assert!(values_equivalent(&json!(1200), &json!(1200)));
        assert!(!values_equivalent(&json!(1200), &json!(1200.5)));
    }
}

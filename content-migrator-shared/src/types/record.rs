//! Source record representation.

use serde_json::Value;

/// One content item fetched from the source system.
///
/// Records are opaque nested JSON documents (scalars, objects, arrays and
/// recursive block trees). They are identified by their content type name
/// plus the `id` and `slug` keys, and are never mutated once fetched.
pub type SourceRecord = Value;

/// Returns `true` for values that must short-circuit field coercion.
///
/// Mirrors the usual notion of an "empty" field: `null`, `false`, `0` and the
/// empty string. Empty arrays and objects are considered populated.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
    }

    #[test]
    fn test_populated_values() {
        assert!(!is_falsy(&json!("x")));
        assert!(!is_falsy(&json!(12)));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
    }
}

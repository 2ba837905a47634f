//! Lenient accessors over `serde_json::Value`.
//!
//! Upstream payloads are loosely typed and frequently omit fields. These
//! helpers never fail: a missing path reads as `Null`, a missing string as
//! `""`, a missing array as an empty slice.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Follow a path of object keys, returning `Null` when any step is missing.
pub fn at<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    let mut cur = value;
    for key in path {
        match cur.get(key) {
            Some(next) => cur = next,
            None => return &NULL,
        }
    }
    cur
}

/// Render a scalar as a string. Strings are returned as-is, numbers and
/// booleans via their JSON form, everything else as `""`.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// `text` of a nested path.
pub fn text_at(value: &Value, path: &[&str]) -> String {
    text(at(value, path))
}

/// First non-empty string among several keys of the same object.
pub fn first_text(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text_at(value, &[k]))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Array contents, or an empty slice.
pub fn array<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    match at(value, path) {
        Value::Array(items) => items.as_slice(),
        _ => &[],
    }
}

/// First element of the array at `path`, or `Null`.
pub fn first<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    array(value, path).first().unwrap_or(&NULL)
}

/// Loose truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// The value at `path`, or an empty string when it is missing or null.
pub fn or_empty(value: &Value, path: &[&str]) -> Value {
    match at(value, path) {
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

/// Parse a number out of either a JSON number or a numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_at_missing_path_is_null() {
        let v = json!({"a": {"b": 1}});
        assert_eq!(at(&v, &["a", "b"]), &json!(1));
        assert!(at(&v, &["a", "x", "y"]).is_null());
    }

    #[test]
    fn test_text_renders_scalars() {
        assert_eq!(text(&json!("x")), "x");
        assert_eq!(text(&json!(12)), "12");
        assert_eq!(text(&json!(null)), "");
        assert_eq!(text(&json!({"a": 1})), "");
    }

    #[test]
    fn test_first_text_skips_empty() {
        let v = json!({"displayName": "", "name": "Chiefs"});
        assert_eq!(first_text(&v, &["displayName", "name"]), "Chiefs");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("-110")));
        assert!(is_truthy(&json!({"close": {}})));
    }

    #[test]
    fn test_as_f64_parses_strings() {
        assert_eq!(as_f64(&json!("0.65")), Some(0.65));
        assert_eq!(as_f64(&json!(3)), Some(3.0));
        assert_eq!(as_f64(&json!("abc")), None);
    }
}

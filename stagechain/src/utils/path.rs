//! Dotted-path lookup over structured values.
//!
//! Paths are `.`-separated segments. A segment addresses a mapping key, or an
//! index when the current value is a sequence. Any step into a missing key,
//! an out-of-range index, or a scalar yields `None`.

use serde_json::Value;

/// Looks up `path` inside `value`.
///
/// An empty path addresses `value` itself.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Renders a value the way it appears when interpolated into text.
///
/// Strings are emitted without quotes, `null` as the empty string, and
/// everything else as compact JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "meta": {"host": "https://github.com", "action": "added"},
            "content": {"id": 23, "labels": ["bug", "ui"]},
            "empty": null
        })
    }

    #[test]
    fn test_lookup_top_level() {
        let p = payload();
        assert_eq!(lookup(&p, "content"), Some(&json!({"id": 23, "labels": ["bug", "ui"]})));
    }

    #[test]
    fn test_lookup_nested() {
        let p = payload();
        assert_eq!(lookup(&p, "meta.action"), Some(&json!("added")));
        assert_eq!(lookup(&p, "content.id"), Some(&json!(23)));
    }

    #[test]
    fn test_lookup_array_index() {
        let p = payload();
        assert_eq!(lookup(&p, "content.labels.1"), Some(&json!("ui")));
        assert_eq!(lookup(&p, "content.labels.9"), None);
        assert_eq!(lookup(&p, "content.labels.first"), None);
    }

    #[test]
    fn test_lookup_missing_branch() {
        let p = payload();
        assert_eq!(lookup(&p, "meta.object"), None);
        assert_eq!(lookup(&p, "missing.deeper.path"), None);
        // Stepping through a scalar is not found, not the scalar itself.
        assert_eq!(lookup(&p, "content.id.value"), None);
    }

    #[test]
    fn test_lookup_null_is_present() {
        let p = payload();
        assert_eq!(lookup(&p, "empty"), Some(&Value::Null));
        assert_eq!(lookup(&p, "empty.inner"), None);
    }

    #[test]
    fn test_lookup_empty_path() {
        let p = payload();
        assert_eq!(lookup(&p, ""), Some(&p));
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("abc")), "abc");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&json!({"a": 1})), r#"{"a":1}"#);
    }
}

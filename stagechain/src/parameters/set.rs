//! The global parameter table.

use super::placeholder::Placeholder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Source of environment variables for `%env(NAME)%` resolution.
pub trait EnvSource {
    /// Returns the variable's value, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// The raw parameters document: `{ parameters: { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParametersDocument {
    /// The flat parameter table.
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

/// Resolved global parameters.
///
/// Built once; `%env(NAME)%` values are resolved at construction and never
/// looked up again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: Map<String, Value>,
}

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from a parameters document, resolving environment
    /// placeholders against `env`.
    ///
    /// An unset variable resolves to `null` with a warning.
    pub fn from_document(doc: ParametersDocument, env: &dyn EnvSource) -> Self {
        let Some(raw) = doc.parameters else {
            tracing::warn!("parameters document has no 'parameters' table");
            return Self::new();
        };

        let values = raw
            .into_iter()
            .map(|(name, value)| {
                let resolved = match value.as_str().and_then(Placeholder::parse) {
                    Some(Placeholder::Env(var)) => env.var(var).map_or_else(
                        || {
                            tracing::warn!(parameter = %name, variable = var, "environment variable not set");
                            Value::Null
                        },
                        Value::String,
                    ),
                    _ => value,
                };
                (name, resolved)
            })
            .collect();

        Self { values }
    }

    /// Gets a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Merges another set into this one; its values win.
    pub fn extend(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrows the underlying table.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Resolves a single value.
    ///
    /// Only a string that is exactly `%name%` is replaced. A missing
    /// parameter resolves to `null` and is logged, never raised.
    #[must_use]
    pub fn resolve(&self, value: &Value) -> Value {
        match value.as_str().and_then(Placeholder::parse) {
            Some(Placeholder::Parameter(name)) => self.get(name).cloned().unwrap_or_else(|| {
                tracing::warn!(parameter = name, "parameter not found, resolving to null");
                Value::Null
            }),
            _ => value.clone(),
        }
    }

    /// Resolves every value of `data` in place.
    pub fn resolve_in_place(&self, data: &mut Map<String, Value>) {
        for value in data.values_mut() {
            *value = self.resolve(value);
        }
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn document(value: Value) -> ParametersDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_env_placeholder_resolved_at_construction() {
        let doc = document(json!({"parameters": {"token": "%env(API_TOKEN)%"}}));
        let set = ParameterSet::from_document(doc, &env(&[("API_TOKEN", "abc123")]));
        assert_eq!(set.get("token"), Some(&json!("abc123")));
    }

    #[test]
    fn test_unset_env_resolves_to_null() {
        let doc = document(json!({"parameters": {"token": "%env(NOT_SET)%"}}));
        let set = ParameterSet::from_document(doc, &env(&[]));
        assert_eq!(set.get("token"), Some(&Value::Null));
    }

    #[test]
    fn test_non_placeholder_values_kept() {
        let doc = document(json!({
            "parameters": {
                "url": "https://api.example.com",
                "retries": 3,
                "embedded": "x %env(API_TOKEN)% y"
            }
        }));
        let set = ParameterSet::from_document(doc, &env(&[("API_TOKEN", "abc123")]));
        assert_eq!(set.get("url"), Some(&json!("https://api.example.com")));
        assert_eq!(set.get("retries"), Some(&json!(3)));
        assert_eq!(set.get("embedded"), Some(&json!("x %env(API_TOKEN)% y")));
    }

    #[test]
    fn test_missing_parameters_table_is_empty() {
        let set = ParameterSet::from_document(ParametersDocument::default(), &ProcessEnv);
        assert!(set.is_empty());
    }

    #[test]
    fn test_resolve_parameter() {
        let set: ParameterSet = [("message".to_string(), json!("hello"))].into_iter().collect();
        assert_eq!(set.resolve(&json!("%message%")), json!("hello"));
    }

    #[test]
    fn test_resolve_missing_parameter_is_null() {
        let set = ParameterSet::new();
        assert_eq!(set.resolve(&json!("%missingParam%")), Value::Null);
    }

    #[test]
    fn test_resolve_passes_through() {
        let set: ParameterSet = [("message".to_string(), json!("hello"))].into_iter().collect();
        assert_eq!(set.resolve(&json!("say %message%")), json!("say %message%"));
        assert_eq!(set.resolve(&json!(12)), json!(12));
        assert_eq!(set.resolve(&json!(["%message%"])), json!(["%message%"]));
    }

    #[test]
    fn test_env_not_reevaluated_for_stage_data() {
        let set = ParameterSet::new();
        // Stage data never reads the environment directly.
        assert_eq!(set.resolve(&json!("%env(HOME)%")), json!("%env(HOME)%"));
    }

    #[test]
    fn test_resolve_in_place() {
        let set: ParameterSet = [("a".to_string(), json!(1))].into_iter().collect();
        let mut data = Map::new();
        data.insert("x".to_string(), json!("%a%"));
        data.insert("y".to_string(), json!("literal"));
        set.resolve_in_place(&mut data);
        assert_eq!(Value::Object(data), json!({"x": 1, "y": "literal"}));
    }

    #[test]
    fn test_extend_overrides() {
        let mut base: ParameterSet = [("a".to_string(), json!(1))].into_iter().collect();
        let other: ParameterSet = [("a".to_string(), json!(2)), ("b".to_string(), json!(3))]
            .into_iter()
            .collect();
        base.extend(other);
        assert_eq!(base.get("a"), Some(&json!(2)));
        assert_eq!(base.len(), 2);
    }
}

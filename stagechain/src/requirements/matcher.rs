//! Payload validation against workflow requirements.

use super::{Expectation, Requirement};
use crate::errors::RequirementError;
use crate::parameters::{interpolate_paths, ParameterSet};
use crate::utils::{lookup, value_to_string};
use crate::workflow::WorkflowDefinition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where `%dotted.path%` placeholders inside requirement patterns are
/// resolved from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderSource {
    /// The triggering payload.
    #[default]
    Payload,
    /// The global parameter set.
    Parameters,
}

/// Checks trigger payloads against a workflow's declared requirements.
#[derive(Debug, Clone, Copy)]
pub struct RequirementMatcher<'a> {
    source: PlaceholderSource,
    parameters: &'a ParameterSet,
}

impl<'a> RequirementMatcher<'a> {
    /// Creates a matcher.
    #[must_use]
    pub const fn new(source: PlaceholderSource, parameters: &'a ParameterSet) -> Self {
        Self { source, parameters }
    }

    /// Validates `payload` against `definition`.
    ///
    /// Payload presence is checked before any field. Evaluation stops at the
    /// first failing requirement.
    ///
    /// # Errors
    ///
    /// Returns the first [`RequirementError`] encountered.
    pub fn check(
        &self,
        definition: &WorkflowDefinition,
        payload: Option<&Value>,
    ) -> Result<(), RequirementError> {
        let Some(requirements) = definition.requirements() else {
            return Ok(());
        };
        if requirements.is_empty() {
            return Ok(());
        }

        let workflow = definition.label();
        let payload = match payload {
            Some(value) if !value.is_null() => value,
            _ => {
                return Err(RequirementError::MissingPayload {
                    workflow: workflow.to_string(),
                })
            }
        };

        requirements
            .iter()
            .try_for_each(|requirement| self.check_one(workflow, requirement, payload))
    }

    fn check_one(
        &self,
        workflow: &str,
        requirement: &Requirement,
        payload: &Value,
    ) -> Result<(), RequirementError> {
        let field = requirement.field.as_str();
        let actual = match lookup(payload, field) {
            Some(value) if !value.is_null() => value,
            _ => {
                return Err(RequirementError::MissingField {
                    workflow: workflow.to_string(),
                    field: field.to_string(),
                })
            }
        };

        let mismatch = |expected: String| RequirementError::Mismatch {
            workflow: workflow.to_string(),
            field: field.to_string(),
            expected,
            actual: actual.clone(),
        };

        match &requirement.expected {
            Expectation::Literal(expected) => {
                if actual == expected {
                    Ok(())
                } else {
                    Err(mismatch(requirement.expected.to_string()))
                }
            }
            Expectation::OneOf(items) => {
                if items.contains(actual) {
                    Ok(())
                } else {
                    Err(mismatch(requirement.expected.to_string()))
                }
            }
            Expectation::Pattern(pattern) => {
                let text = value_to_string(actual);
                if let Some(regex) = pattern.compiled() {
                    return if regex.is_match(&text) {
                        Ok(())
                    } else {
                        Err(mismatch(requirement.expected.to_string()))
                    };
                }

                let expanded = self.expand_pattern(pattern.as_str(), payload);
                let regex = Regex::new(&expanded).map_err(|e| RequirementError::InvalidPattern {
                    workflow: workflow.to_string(),
                    field: field.to_string(),
                    message: e.to_string(),
                })?;
                if regex.is_match(&text) {
                    Ok(())
                } else {
                    Err(mismatch(format!("/{expanded}/")))
                }
            }
        }
    }

    /// Substitutes embedded placeholders. Substituted values are escaped so
    /// they match literally.
    fn expand_pattern(&self, pattern: &str, payload: &Value) -> String {
        if !pattern.contains('%') {
            return pattern.to_string();
        }
        interpolate_paths(pattern, |path| {
            let value = match self.source {
                PlaceholderSource::Payload => lookup(payload, path),
                PlaceholderSource::Parameters => {
                    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
                    self.parameters.get(head).and_then(|v| lookup(v, rest))
                }
            };
            value.map(|v| regex::escape(&value_to_string(v)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowDocument;
    use serde_json::json;

    fn definition(requirements: Value) -> WorkflowDefinition {
        let doc: WorkflowDocument = serde_json::from_value(json!({
            "id": "github-all",
            "name": "Github",
            "requirements": {"data": requirements},
            "stages": [{"notify": {"job": "message"}}]
        }))
        .unwrap();
        WorkflowDefinition::build(doc, "test", &ParameterSet::new()).unwrap()
    }

    fn payload() -> Value {
        json!({
            "meta": {"host": "https://github.com", "action": "added", "object": "issue"},
            "content": {"id": 23}
        })
    }

    fn matcher(params: &ParameterSet) -> RequirementMatcher<'_> {
        RequirementMatcher::new(PlaceholderSource::Payload, params)
    }

    #[test]
    fn test_no_requirements_passes() {
        let doc: WorkflowDocument = serde_json::from_value(json!({
            "id": "plain",
            "stages": [{"a": {"job": "message"}}]
        }))
        .unwrap();
        let def = WorkflowDefinition::build(doc, "test", &ParameterSet::new()).unwrap();
        let params = ParameterSet::new();
        assert!(matcher(&params).check(&def, None).is_ok());
    }

    #[test]
    fn test_missing_payload_checked_first() {
        let def = definition(json!([{"meta.action": {"equals": "nope"}}]));
        let params = ParameterSet::new();
        let err = matcher(&params).check(&def, None).unwrap_err();
        assert!(matches!(err, RequirementError::MissingPayload { .. }));
        let err = matcher(&params).check(&def, Some(&Value::Null)).unwrap_err();
        assert!(matches!(err, RequirementError::MissingPayload { .. }));
    }

    #[test]
    fn test_literal_match() {
        let def = definition(json!([{"content.id": 23}]));
        let params = ParameterSet::new();
        assert!(matcher(&params).check(&def, Some(&payload())).is_ok());

        let other = json!({"content": {"id": 24}});
        let err = matcher(&params).check(&def, Some(&other)).unwrap_err();
        assert!(matches!(err, RequirementError::Mismatch { ref actual, .. } if *actual == json!(24)));
    }

    #[test]
    fn test_literal_string_is_exact() {
        let def = definition(json!([{"meta.action": {"equals": "added"}}]));
        let params = ParameterSet::new();
        assert!(matcher(&params).check(&def, Some(&payload())).is_ok());

        let padded = json!({"meta": {"action": " added"}});
        assert!(matcher(&params).check(&def, Some(&padded)).is_err());
    }

    #[test]
    fn test_membership() {
        let def = definition(json!([{"meta.object": ["issue", "pull_request"]}]));
        let params = ParameterSet::new();
        assert!(matcher(&params).check(&def, Some(&payload())).is_ok());

        let commit = json!({"meta": {"object": "commit"}});
        assert!(matcher(&params).check(&def, Some(&commit)).is_err());
    }

    #[test]
    fn test_pattern_match() {
        let def = definition(json!([{"meta.action": "^added$"}, {"content.id": "^2[0-9]$"}]));
        let params = ParameterSet::new();
        assert!(matcher(&params).check(&def, Some(&payload())).is_ok());

        let padded = json!({"meta": {"action": " added"}, "content": {"id": 23}});
        let err = matcher(&params).check(&def, Some(&padded)).unwrap_err();
        assert_eq!(err.field(), Some("meta.action"));
    }

    #[test]
    fn test_missing_field_is_error() {
        let def = definition(json!([{"meta.missing": "x"}]));
        let params = ParameterSet::new();
        let err = matcher(&params).check(&def, Some(&payload())).unwrap_err();
        assert!(matches!(err, RequirementError::MissingField { ref field, .. } if field == "meta.missing"));
    }

    #[test]
    fn test_fail_fast_on_first_field() {
        let def = definition(json!([{"meta.action": "^removed$"}, {"nope.nope": "x"}]));
        let params = ParameterSet::new();
        let err = matcher(&params).check(&def, Some(&payload())).unwrap_err();
        assert_eq!(err.field(), Some("meta.action"));
    }

    #[test]
    fn test_pattern_placeholder_from_payload() {
        let def = definition(json!([{"meta.host": "^%meta.expected_host%$"}]));
        let params = ParameterSet::new();
        let p = json!({"meta": {"host": "a.b", "expected_host": "a.b"}});
        assert!(matcher(&params).check(&def, Some(&p)).is_ok());

        // The substituted value is escaped, so '.' does not match any char.
        let p = json!({"meta": {"host": "axb", "expected_host": "a.b"}});
        assert!(matcher(&params).check(&def, Some(&p)).is_err());
    }

    #[test]
    fn test_pattern_placeholder_from_parameters() {
        let def = definition(json!([{"meta.host": "^%github.host%$"}]));
        let params: ParameterSet = [("github".to_string(), json!({"host": "https://github.com"}))]
            .into_iter()
            .collect();
        let m = RequirementMatcher::new(PlaceholderSource::Parameters, &params);
        assert!(m.check(&def, Some(&payload())).is_ok());
    }

    #[test]
    fn test_invalid_templated_pattern() {
        let def = definition(json!([{"meta.action": "([%meta.object%"}]));
        let params = ParameterSet::new();
        let err = matcher(&params).check(&def, Some(&payload())).unwrap_err();
        assert!(matches!(err, RequirementError::InvalidPattern { .. }));
    }

    #[test]
    fn test_group_checked_in_declared_order() {
        let def = definition(json!([{"z.first": "^x$", "a.second": "^y$"}]));
        let params = ParameterSet::new();
        let p = json!({"z": {"first": "no"}, "a": {"second": "no"}});
        let err = matcher(&params).check(&def, Some(&p)).unwrap_err();
        assert_eq!(err.field(), Some("z.first"));
    }
}

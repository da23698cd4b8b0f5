//! Validated workflow definitions.

use super::config::{StagesConfig, WorkflowDocument};
use super::stage::Stage;
use crate::dispatch::WorkflowInfo;
use crate::errors::DefinitionError;
use crate::parameters::ParameterSet;
use crate::requirements::Requirements;

/// A workflow that passed shape validation, with its stage trees built and
/// stage data resolved against the global parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    id: String,
    name: Option<String>,
    description: Option<String>,
    entity: Option<String>,
    action: Option<String>,
    requirements: Option<Requirements>,
    stages: Vec<Stage>,
    source: String,
}

impl WorkflowDefinition {
    /// Validates a document and builds its stage trees.
    ///
    /// `source` names where the document came from, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] if the id or stage tree is missing, a
    /// stage list entry is malformed, a stage has no job, or a requirement
    /// pattern does not compile.
    pub fn build(
        doc: WorkflowDocument,
        source: impl Into<String>,
        parameters: &ParameterSet,
    ) -> Result<Self, DefinitionError> {
        let source = source.into();

        let id = match doc.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(DefinitionError::MissingId { source_name: source }),
        };

        let stages = match doc.stages {
            Some(stages) if !stages.is_empty() => stages,
            _ => return Err(DefinitionError::MissingStages { workflow_id: id }),
        };
        if let StagesConfig::List(items) = &stages {
            if let Some((index, item)) = items.iter().enumerate().find(|(_, item)| item.len() != 1) {
                return Err(DefinitionError::InvalidStage {
                    reason: format!("entry {index} has {} keys, expected one", item.len()),
                    workflow_id: id,
                });
            }
        }
        let entries = stages.into_entries();

        let mut stages = entries
            .into_iter()
            .map(|(name, config)| Stage::build(&id, name, config))
            .collect::<Result<Vec<_>, _>>()?;

        for stage in &mut stages {
            stage.resolve_data(parameters);
        }

        let requirements = doc
            .requirements
            .and_then(|r| r.data)
            .map(|data| Requirements::from_data(&id, data))
            .transpose()?;

        Ok(Self {
            id,
            name: doc.name,
            description: doc.description,
            entity: doc.entity,
            action: doc.action,
            requirements,
            stages,
            source,
        })
    }

    /// Returns the workflow id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the name, falling back to the id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the entity matching key.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the action matching key.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Returns the declared requirements.
    #[must_use]
    pub const fn requirements(&self) -> Option<&Requirements> {
        self.requirements.as_ref()
    }

    /// Returns the root stages.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns where the document came from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the workflow fields exposed to jobs.
    #[must_use]
    pub fn info(&self) -> WorkflowInfo {
        WorkflowInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Outcome;
    use serde_json::{json, Value};

    fn document(value: Value) -> WorkflowDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_full_document() {
        let params: ParameterSet = [("message".to_string(), json!("Hello"))].into_iter().collect();
        let def = WorkflowDefinition::build(
            document(json!({
                "id": "github-all",
                "name": "Github all",
                "description": "Every github event",
                "entity": "issue",
                "action": "added",
                "requirements": {"data": [{"meta.action": "added"}]},
                "stages": [
                    {"first": {"job": "message", "data": [{"message": "%message%"}],
                               "on_success": {"job": "message"}}}
                ]
            })),
            "workflows/github/workflow.yml",
            &params,
        )
        .unwrap();

        assert_eq!(def.id(), "github-all");
        assert_eq!(def.label(), "Github all");
        assert_eq!(def.entity(), Some("issue"));
        assert_eq!(def.action(), Some("added"));
        assert_eq!(def.source(), "workflows/github/workflow.yml");
        assert_eq!(def.stages().len(), 1);
        assert_eq!(def.stages()[0].data().get("message"), Some(&json!("Hello")));
        assert!(def.stages()[0].child(Outcome::Success).is_some());
        assert!(def.requirements().is_some());
    }

    #[test]
    fn test_missing_id() {
        let err = WorkflowDefinition::build(
            document(json!({"stages": [{"a": {"job": "a"}}]})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert_eq!(err, DefinitionError::MissingId { source_name: "a.yml".to_string() });
    }

    #[test]
    fn test_empty_id() {
        let err = WorkflowDefinition::build(
            document(json!({"id": "", "stages": [{"a": {"job": "a"}}]})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingId { .. }));
    }

    #[test]
    fn test_missing_stages() {
        let err = WorkflowDefinition::build(
            document(json!({"id": "wf"})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert_eq!(err, DefinitionError::MissingStages { workflow_id: "wf".to_string() });

        let err = WorkflowDefinition::build(
            document(json!({"id": "wf", "stages": []})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingStages { .. }));
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let def = WorkflowDefinition::build(
            document(json!({"id": "wf", "stages": [{"a": {"job": "a"}}]})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap();
        assert_eq!(def.label(), "wf");
        assert_eq!(def.info().name, None);
    }

    #[test]
    fn test_multi_key_stage_entry_rejected() {
        let err = WorkflowDefinition::build(
            document(json!({"id": "wf", "stages": [{"a": {"job": "a"}, "b": {"job": "b"}}]})),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::InvalidStage {
                workflow_id: "wf".to_string(),
                reason: "entry 0 has 2 keys, expected one".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_requirement_pattern_rejected() {
        let err = WorkflowDefinition::build(
            document(json!({
                "id": "wf",
                "requirements": {"data": [{"meta.action": "([unclosed"}]},
                "stages": [{"a": {"job": "a"}}]
            })),
            "a.yml",
            &ParameterSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidPattern { ref field, .. } if field == "meta.action"));
    }
}

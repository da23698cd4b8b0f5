//! The stage tree.
//!
//! A [`Stage`] is one dispatchable unit of work. It exclusively owns its
//! `on_success` and `on_fail` continuations, so a tree built from nested
//! configuration can never contain a cycle.

use super::config::StageConfig;
use crate::errors::DefinitionError;
use crate::parameters::ParameterSet;
use crate::utils::StageId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Priority given to stages that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// How a dispatched stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The job completed.
    Success,
    /// The job failed.
    Fail,
}

impl Outcome {
    /// Suffix used to derive the name of an unnamed child.
    #[must_use]
    pub const fn name_suffix(self) -> &'static str {
        match self {
            Self::Success => "on_success",
            Self::Fail => "on_fail",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// A continuation: the child stage plus the id of the stage that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildStage {
    /// Id of the parent stage.
    pub parent_id: StageId,
    /// The child itself.
    pub stage: Stage,
}

/// One node of a workflow's stage tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    id: StageId,
    name: String,
    job: String,
    data: Map<String, Value>,
    priority: i32,
    repeat: Option<Value>,
    on_success: Option<Box<ChildStage>>,
    on_fail: Option<Box<ChildStage>>,
}

impl Stage {
    /// Creates a leaf stage with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            id: StageId::generate(),
            name: name.into(),
            job: job.into(),
            data: Map::new(),
            priority: DEFAULT_PRIORITY,
            repeat: None,
            on_success: None,
            on_fail: None,
        }
    }

    /// Sets the data mapping.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Sets one data value.
    #[must_use]
    pub fn with_data_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the repeat hint.
    #[must_use]
    pub fn with_repeat(mut self, repeat: Value) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Attaches the child run on success.
    #[must_use]
    pub fn with_on_success(self, child: Self) -> Self {
        self.with_child(Outcome::Success, child)
    }

    /// Attaches the child run on failure.
    #[must_use]
    pub fn with_on_fail(self, child: Self) -> Self {
        self.with_child(Outcome::Fail, child)
    }

    /// Attaches a child for `outcome`, replacing any existing one.
    #[must_use]
    pub fn with_child(mut self, outcome: Outcome, child: Self) -> Self {
        let slot = Some(Box::new(ChildStage {
            parent_id: self.id,
            stage: child,
        }));
        match outcome {
            Outcome::Success => self.on_success = slot,
            Outcome::Fail => self.on_fail = slot,
        }
        self
    }

    /// Builds a stage tree from configuration.
    ///
    /// Unnamed children are named `<parent>-on_success` / `<parent>-on_fail`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::MissingJob`] if this stage or any
    /// descendant has no job.
    pub fn build(
        workflow_id: &str,
        name: impl Into<String>,
        config: StageConfig,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        let job = match config.job {
            Some(job) if !job.trim().is_empty() => job,
            _ => {
                return Err(DefinitionError::MissingJob {
                    workflow_id: workflow_id.to_string(),
                    stage: name,
                })
            }
        };

        let mut stage = Self::new(name, job)
            .with_data(config.data.map(super::StageData::into_map).unwrap_or_default())
            .with_priority(config.priority.unwrap_or(DEFAULT_PRIORITY));
        stage.repeat = config.repeat;

        for (outcome, child) in [
            (Outcome::Success, config.on_success),
            (Outcome::Fail, config.on_fail),
        ] {
            if let Some(child) = child {
                let child_name = child
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}", stage.name, outcome.name_suffix()));
                let child = Self::build(workflow_id, child_name, *child)?;
                stage = stage.with_child(outcome, child);
            }
        }

        Ok(stage)
    }

    /// Deep-copies the tree, giving every node a fresh id.
    ///
    /// Each dispatch works on its own instance so concurrent runs of the
    /// same workflow never share a job id.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        let mut instance = Self {
            id: StageId::generate(),
            name: self.name.clone(),
            job: self.job.clone(),
            data: self.data.clone(),
            priority: self.priority,
            repeat: self.repeat.clone(),
            on_success: None,
            on_fail: None,
        };
        for outcome in [Outcome::Success, Outcome::Fail] {
            if let Some(child) = self.child(outcome) {
                instance = instance.with_child(outcome, child.instantiate());
            }
        }
        instance
    }

    /// Resolves `%param%` data values in this stage and all descendants.
    pub(crate) fn resolve_data(&mut self, parameters: &ParameterSet) {
        parameters.resolve_in_place(&mut self.data);
        for child in [self.on_success.as_mut(), self.on_fail.as_mut()].into_iter().flatten() {
            child.stage.resolve_data(parameters);
        }
    }

    /// Returns the stage id.
    #[must_use]
    pub const fn id(&self) -> StageId {
        self.id
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the job type.
    #[must_use]
    pub fn job(&self) -> &str {
        &self.job
    }

    /// Returns the data mapping.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the repeat hint.
    #[must_use]
    pub const fn repeat(&self) -> Option<&Value> {
        self.repeat.as_ref()
    }

    /// Returns the continuation for `outcome`, with its parent id.
    #[must_use]
    pub fn continuation(&self, outcome: Outcome) -> Option<&ChildStage> {
        match outcome {
            Outcome::Success => self.on_success.as_deref(),
            Outcome::Fail => self.on_fail.as_deref(),
        }
    }

    /// Returns the child stage for `outcome`.
    #[must_use]
    pub fn child(&self, outcome: Outcome) -> Option<&Self> {
        self.continuation(outcome).map(|c| &c.stage)
    }

    /// Consumes the stage, returning its child for `outcome`.
    #[must_use]
    pub fn into_child(self, outcome: Outcome) -> Option<Self> {
        let slot = match outcome {
            Outcome::Success => self.on_success,
            Outcome::Fail => self.on_fail,
        };
        slot.map(|c| c.stage)
    }

    /// Returns true if the stage has any continuation.
    #[must_use]
    pub const fn has_children(&self) -> bool {
        self.on_success.is_some() || self.on_fail.is_some()
    }

    /// Iterates the tree depth-first, this stage first.
    pub fn walk(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let stage = stack.pop()?;
            stack.extend(stage.child(Outcome::Fail));
            stack.extend(stage.child(Outcome::Success));
            Some(stage)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(value: Value) -> StageConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_leaf() {
        let stage = Stage::build(
            "wf",
            "notify",
            config(json!({"job": "message", "data": [{"message": "hi"}]})),
        )
        .unwrap();

        assert_eq!(stage.name(), "notify");
        assert_eq!(stage.job(), "message");
        assert_eq!(stage.priority(), DEFAULT_PRIORITY);
        assert_eq!(stage.data().get("message"), Some(&json!("hi")));
        assert!(!stage.has_children());
    }

    #[test]
    fn test_build_derives_child_names() {
        let stage = Stage::build(
            "wf",
            "fetch",
            config(json!({
                "job": "http",
                "on_success": {"job": "store", "on_success": {"job": "notify"}},
                "on_fail": {"name": "alert", "job": "page"}
            })),
        )
        .unwrap();

        let success = stage.child(Outcome::Success).unwrap();
        assert_eq!(success.name(), "fetch-on_success");
        assert_eq!(
            success.child(Outcome::Success).unwrap().name(),
            "fetch-on_success-on_success"
        );
        assert_eq!(stage.child(Outcome::Fail).unwrap().name(), "alert");
    }

    #[test]
    fn test_children_record_parent_id() {
        let stage = Stage::build(
            "wf",
            "a",
            config(json!({"job": "a", "on_fail": {"job": "b"}})),
        )
        .unwrap();

        let continuation = stage.continuation(Outcome::Fail).unwrap();
        assert_eq!(continuation.parent_id, stage.id());
        assert!(stage.continuation(Outcome::Success).is_none());
    }

    #[test]
    fn test_build_missing_job_in_child() {
        let err = Stage::build(
            "wf",
            "a",
            config(json!({"job": "a", "on_success": {"name": "b"}})),
        )
        .unwrap_err();

        assert_eq!(
            err,
            DefinitionError::MissingJob {
                workflow_id: "wf".to_string(),
                stage: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_build_blank_job_rejected() {
        assert!(Stage::build("wf", "a", config(json!({"job": "  "}))).is_err());
    }

    #[test]
    fn test_ids_unique_across_tree() {
        let stage = Stage::new("a", "a")
            .with_on_success(Stage::new("b", "b"))
            .with_on_fail(Stage::new("c", "c"));
        let ids: std::collections::HashSet<_> = stage.walk().map(Stage::id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_instantiate_fresh_ids() {
        let template = Stage::new("a", "a")
            .with_priority(5)
            .with_data_value("k", json!("v"))
            .with_on_success(Stage::new("b", "b"));

        let instance = template.instantiate();
        assert_ne!(instance.id(), template.id());
        assert_eq!(instance.priority(), 5);
        assert_eq!(instance.data(), template.data());

        let child = instance.continuation(Outcome::Success).unwrap();
        assert_eq!(child.parent_id, instance.id());
        assert_ne!(child.stage.id(), template.child(Outcome::Success).unwrap().id());
        assert_eq!(child.stage.name(), "b");
    }

    #[test]
    fn test_resolve_data_recursive() {
        let params: ParameterSet = [("greeting".to_string(), json!("hello"))].into_iter().collect();
        let mut stage = Stage::new("a", "a")
            .with_data_value("m", json!("%greeting%"))
            .with_on_fail(Stage::new("b", "b").with_data_value("m", json!("%missing%")));

        stage.resolve_data(&params);

        assert_eq!(stage.data().get("m"), Some(&json!("hello")));
        assert_eq!(
            stage.child(Outcome::Fail).unwrap().data().get("m"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_walk_order() {
        let stage = Stage::new("a", "a")
            .with_on_success(Stage::new("b", "b").with_on_success(Stage::new("c", "c")))
            .with_on_fail(Stage::new("d", "d"));
        let names: Vec<_> = stage.walk().map(Stage::name).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_into_child() {
        let stage = Stage::new("a", "a").with_on_success(Stage::new("b", "b"));
        assert!(stage.clone().into_child(Outcome::Fail).is_none());
        assert_eq!(stage.into_child(Outcome::Success).unwrap().name(), "b");
    }
}

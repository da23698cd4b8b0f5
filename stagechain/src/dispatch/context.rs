//! The context object handed to every dispatched job.
//!
//! Serialized shape:
//!
//! ```json
//! {
//!   "body": <trigger payload>,
//!   "previous": <parent result or error, null for root stages>,
//!   "workflow": {
//!     "config": {"id": "...", "name": "...", "description": "..."},
//!     "stage": {"name": "..."},
//!     "data": {...stage data...}
//!   }
//! }
//! ```

use crate::workflow::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Workflow fields exposed to jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    /// Workflow id.
    pub id: String,
    /// Workflow name.
    pub name: Option<String>,
    /// Workflow description.
    pub description: Option<String>,
}

/// Stage fields exposed to jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInfo {
    /// Stage name.
    pub name: String,
}

/// The `workflow` part of an execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// Workflow fields.
    pub config: WorkflowInfo,
    /// Stage fields.
    pub stage: StageInfo,
    /// The stage's resolved data.
    pub data: Map<String, Value>,
}

/// Everything a job receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// The original trigger payload.
    pub body: Value,
    /// The parent's result or error; `null` for root stages.
    pub previous: Value,
    /// Workflow and stage information.
    pub workflow: WorkflowContext,
}

impl ExecutionContext {
    /// Builds the context for dispatching `stage`.
    #[must_use]
    pub fn new(body: Value, previous: Value, workflow: &WorkflowInfo, stage: &Stage) -> Self {
        Self {
            body,
            previous,
            workflow: WorkflowContext {
                config: workflow.clone(),
                stage: StageInfo {
                    name: stage.name().to_string(),
                },
                data: stage.data().clone(),
            },
        }
    }

    /// Returns a stage data value.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.workflow.data.get(key)
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.workflow.stage.name
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

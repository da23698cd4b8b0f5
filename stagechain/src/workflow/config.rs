//! Raw, deserializable workflow documents.
//!
//! These types mirror the on-disk shape and accept anything structurally
//! plausible. Shape rules (required id, jobs, non-empty stage tree) are
//! enforced when a document is built into a [`WorkflowDefinition`].
//!
//! [`WorkflowDefinition`]: super::WorkflowDefinition

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Unique workflow id.
    #[serde(default)]
    pub id: Option<String>,
    /// Human readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional matching key.
    #[serde(default)]
    pub entity: Option<String>,
    /// Optional matching key.
    #[serde(default)]
    pub action: Option<String>,
    /// Payload requirements.
    #[serde(default)]
    pub requirements: Option<RequirementsConfig>,
    /// Root stages.
    #[serde(default)]
    pub stages: Option<StagesConfig>,
}

/// The `requirements` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementsConfig {
    /// List of `field -> expectation` mappings, each in declared order.
    #[serde(default)]
    pub data: Option<Vec<Map<String, Value>>>,
}

/// Root stages, either as a list of single-key `name: config` mappings
/// (preserving order) or as one mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StagesConfig {
    /// `- name: { job: ... }`
    List(Vec<BTreeMap<String, StageConfig>>),
    /// `name: { job: ... }`
    Map(BTreeMap<String, StageConfig>),
}

impl StagesConfig {
    /// Returns true if no stage is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(entries) => entries.iter().all(BTreeMap::is_empty),
            Self::Map(entries) => entries.is_empty(),
        }
    }

    /// Flattens into ordered `(name, config)` pairs.
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, StageConfig)> {
        match self {
            Self::List(entries) => entries.into_iter().flatten().collect(),
            Self::Map(entries) => entries.into_iter().collect(),
        }
    }
}

/// One stage and its continuations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Explicit name; used for `on_success` / `on_fail` children.
    #[serde(default)]
    pub name: Option<String>,
    /// Job type to run.
    #[serde(default)]
    pub job: Option<String>,
    /// Template values handed to the job.
    #[serde(default)]
    pub data: Option<StageData>,
    /// Dispatch priority.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Repeat hint for the engine, passed through untouched.
    #[serde(default)]
    pub repeat: Option<Value>,
    /// Stage to run when this one completes.
    #[serde(default)]
    pub on_success: Option<Box<StageConfig>>,
    /// Stage to run when this one fails.
    #[serde(default)]
    pub on_fail: Option<Box<StageConfig>>,
}

/// Stage data, either a list of single-key mappings or a plain mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageData {
    /// `- key: value`
    List(Vec<Map<String, Value>>),
    /// `key: value`
    Map(Map<String, Value>),
}

impl StageData {
    /// Merges into one flat mapping; later keys win.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            Self::List(entries) => entries.into_iter().flatten().collect(),
            Self::Map(map) => map,
        }
    }
}

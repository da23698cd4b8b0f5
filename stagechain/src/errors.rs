//! Error types for the stagechain orchestrator.
//!
//! Each error is scoped to the smallest unit it can spoil: a
//! [`DefinitionError`] rejects one workflow document, a [`RequirementError`]
//! rejects one trigger/definition pairing. Missing placeholder values are not
//! errors at all; they are logged and resolve to `null`.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stagechain operations.
#[derive(Debug, Error)]
pub enum StagechainError {
    /// A workflow document was malformed.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// A trigger payload did not satisfy a workflow's requirements.
    #[error("{0}")]
    Requirement(#[from] RequirementError),

    /// The job engine rejected or lost a submission.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// The orchestrator configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A document could not be read or parsed.
    #[error("{0}")]
    Load(#[from] LoadError),
}

/// Error raised when a workflow document fails shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The document has no `id`, or it is empty.
    #[error("'id' missing in {source_name}")]
    MissingId {
        /// Where the document came from (file path or caller label).
        source_name: String,
    },

    /// The document has no stage tree, or it is empty.
    #[error("'stages' missing in workflow '{workflow_id}'")]
    MissingStages {
        /// The workflow id.
        workflow_id: String,
    },

    /// A stage has no `job`, or it is empty.
    #[error("stage '{stage}' in workflow '{workflow_id}' has no job")]
    MissingJob {
        /// The workflow id.
        workflow_id: String,
        /// The stage name.
        stage: String,
    },

    /// A stage entry is not a single-key mapping of name to config.
    #[error("invalid stage entry in workflow '{workflow_id}': {reason}")]
    InvalidStage {
        /// The workflow id.
        workflow_id: String,
        /// What was wrong with the entry.
        reason: String,
    },

    /// A requirement pattern is not a valid regular expression.
    #[error("invalid requirement pattern for {field} in workflow '{workflow_id}': {message}")]
    InvalidPattern {
        /// The workflow id.
        workflow_id: String,
        /// The dotted field path.
        field: String,
        /// The regex compiler message.
        message: String,
    },

    /// The workflow id is already registered.
    #[error("workflow '{workflow_id}' is already registered")]
    DuplicateId {
        /// The workflow id.
        workflow_id: String,
    },

    /// The document does not deserialize into the workflow shape.
    #[error("malformed workflow document {source_name}: {message}")]
    Malformed {
        /// Where the document came from.
        source_name: String,
        /// The deserializer message.
        message: String,
    },
}

/// Error raised when a payload fails a workflow's declared requirements.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequirementError {
    /// Requirements exist but the trigger carried no payload.
    #[error("[{workflow}] Requirements not completed : no data given")]
    MissingPayload {
        /// The workflow name (or id when unnamed).
        workflow: String,
    },

    /// The payload has no value at the required path.
    #[error("[{workflow}] Requirements not completed : no data given for {field}")]
    MissingField {
        /// The workflow name (or id when unnamed).
        workflow: String,
        /// The dotted field path.
        field: String,
    },

    /// The payload value did not satisfy the expectation.
    #[error("[{workflow}] Requirements not completed : {field} requires {expected} ; got {actual}")]
    Mismatch {
        /// The workflow name (or id when unnamed).
        workflow: String,
        /// The dotted field path.
        field: String,
        /// The rendered expectation.
        expected: String,
        /// The offending payload value.
        actual: Value,
    },

    /// A requirement pattern is not a valid regular expression.
    #[error("[{workflow}] invalid pattern for {field}: {message}")]
    InvalidPattern {
        /// The workflow name (or id when unnamed).
        workflow: String,
        /// The dotted field path.
        field: String,
        /// The regex compiler message.
        message: String,
    },
}

impl RequirementError {
    /// Returns the field the error is about, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingPayload { .. } => None,
            Self::MissingField { field, .. }
            | Self::Mismatch { field, .. }
            | Self::InvalidPattern { field, .. } => Some(field),
        }
    }
}

/// Errors reported by a job engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine is no longer accepting work.
    #[error("job engine is shut down")]
    ShutDown,

    /// The engine refused the submission.
    #[error("submission of job {job_id} rejected: {reason}")]
    Rejected {
        /// The job id.
        job_id: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error returned by a job handler. The engine reports it as a `failed`
/// outcome; it is not a defect of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobError {
    /// The failure message.
    pub message: String,
}

impl JobError {
    /// Creates a new job error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for JobError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for JobError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors in the orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No workflows directory and no injected dependencies.
    #[error("Workflows directory missing")]
    MissingWorkflowsDirectory,

    /// No jobs directory.
    #[error("Jobs directory missing")]
    MissingJobsDirectory,

    /// The parameters path is not a YAML file.
    #[error("Parameters file is not YAML : {0}")]
    ParametersNotYaml(String),

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidEnv {
        /// The environment variable.
        key: String,
        /// The raw value.
        value: String,
    },
}

/// Errors reading documents from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file or directory path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for the expected shape.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The parser message.
        message: String,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for results in this crate.
pub type Result<T, E = StagechainError> = std::result::Result<T, E>;

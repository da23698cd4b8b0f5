//! The job engine contract.
//!
//! The orchestrator never runs jobs itself. It submits [`JobSubmission`]s to
//! a [`JobEngine`] and reacts to the [`EngineSignal`]s the engine delivers
//! to a [`SignalHandler`] once a job finishes. Durability, retries and
//! scheduling belong to the engine.

mod handler;
mod memory;

pub use handler::{FnHandler, HandlerRegistry, JobHandler};
pub use memory::InMemoryEngine;

use crate::dispatch::ExecutionContext;
use crate::errors::EngineError;
use crate::utils::StageId;
use crate::workflow::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Queue name used when none is configured.
pub const DEFAULT_QUEUE_NAME: &str = "global-jobs";

/// Dispatch options forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Lower values run first.
    pub priority: i32,
    /// Opaque repeat/backoff hint from the stage definition.
    pub repeat: Option<Value>,
}

/// One unit of work handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Unique job identity; the dispatched stage instance's id.
    pub job_id: StageId,
    /// The job type (the stage's `job`).
    pub job_type: String,
    /// Context passed to the handler.
    pub context: ExecutionContext,
    /// Dispatch options.
    pub options: SubmitOptions,
    /// When the dispatcher submitted the job.
    pub submitted_at: DateTime<Utc>,
}

/// Completion signal delivered by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// The job completed with a result.
    Completed(Value),
    /// The job failed with an error.
    Failed(Value),
}

impl EngineSignal {
    /// Builds a failure signal from an error message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(Value::String(message.into()))
    }

    /// Returns the outcome this signal reports.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Completed(_) => Outcome::Success,
            Self::Failed(_) => Outcome::Fail,
        }
    }

    /// Returns the result or error carried by the signal.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Completed(value) | Self::Failed(value) => value,
        }
    }
}

/// An external job-execution engine.
///
/// `submit` must only enqueue; it never waits for the job to run.
#[cfg_attr(test, mockall::automock)]
pub trait JobEngine: Send + Sync {
    /// Enqueues a job. Submitting an already known `job_id` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the engine cannot accept the job.
    fn submit(&self, submission: JobSubmission) -> Result<(), EngineError>;
}

/// Receives completion and failure signals from an engine.
pub trait SignalHandler: Send + Sync {
    /// Called once a job identified by `job_id` finishes.
    fn on_engine_signal(&self, job_id: StageId, signal: EngineSignal);
}

//! Dispatcher lifecycle events.
//!
//! The dispatcher reports what it does through an injected [`EventSink`].
//! Event payloads are JSON objects carrying at least `workflow_id`; stage
//! events add `stage`, `job` and `job_id`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A trigger passed requirements and its root stages are being dispatched.
pub const WORKFLOW_TRIGGERED: &str = "workflow.triggered";
/// A trigger failed a workflow's requirements.
pub const WORKFLOW_REJECTED: &str = "workflow.rejected";
/// A stage was submitted to the engine.
pub const STAGE_DISPATCHED: &str = "stage.dispatched";
/// The engine refused a stage submission.
pub const STAGE_DISPATCH_FAILED: &str = "stage.dispatch_failed";
/// A finished stage had a child for its outcome; the child follows as
/// `stage.dispatched`.
pub const STAGE_CHAINED: &str = "stage.chained";
/// A finished stage had no child for its outcome.
pub const STAGE_TERMINAL: &str = "stage.terminal";

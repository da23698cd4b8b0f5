//! Trigger handling and success/failure chaining.

use super::context::{ExecutionContext, WorkflowInfo};
use super::pending::PendingRegistry;
use crate::engine::{EngineSignal, JobEngine, JobSubmission, SignalHandler, SubmitOptions};
use crate::events::{
    EventSink, NoOpEventSink, STAGE_CHAINED, STAGE_DISPATCHED, STAGE_DISPATCH_FAILED,
    STAGE_TERMINAL, WORKFLOW_REJECTED, WORKFLOW_TRIGGERED,
};
use crate::requirements::{PlaceholderSource, RequirementMatcher};
use crate::utils::StageId;
use crate::workflow::{Stage, WorkflowRegistry};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dispatches root stages on trigger and their children on engine signals.
///
/// Both entry points take `&self` and are safe to call concurrently. Neither
/// returns an error: every failure is logged and reported to the event sink.
pub struct ChainDispatcher {
    registry: Arc<WorkflowRegistry>,
    engine: Arc<dyn JobEngine>,
    pending: PendingRegistry,
    events: Arc<dyn EventSink>,
    placeholder_source: PlaceholderSource,
}

impl ChainDispatcher {
    /// Creates a dispatcher over a loaded registry.
    #[must_use]
    pub fn new(registry: Arc<WorkflowRegistry>, engine: Arc<dyn JobEngine>) -> Self {
        Self {
            registry,
            engine,
            pending: PendingRegistry::new(),
            events: Arc::new(NoOpEventSink),
            placeholder_source: PlaceholderSource::default(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets where requirement pattern placeholders are resolved from.
    #[must_use]
    pub const fn with_placeholder_source(mut self, source: PlaceholderSource) -> Self {
        self.placeholder_source = source;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// Returns the number of dispatched parents still waiting for a signal.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops pending children whose parent was dispatched more than
    /// `max_age` ago. A job that fails for good never sends the completion
    /// its success branch waits for, so long-running hosts call this
    /// periodically. Returns how many parents were dropped.
    pub fn prune_pending(&self, max_age: chrono::Duration) -> usize {
        let dropped = self.pending.prune_before(Utc::now() - max_age);
        if dropped > 0 {
            debug!(dropped, "Pruned stale pending children");
        }
        dropped
    }

    /// Handles a trigger event.
    ///
    /// Every workflow with id `workflow_id` whose requirements accept
    /// `payload` has its root stages instantiated and dispatched. Unknown
    /// ids dispatch nothing.
    pub fn trigger(&self, workflow_id: &str, payload: Option<Value>) {
        let definitions: Vec<_> = self.registry.matching(workflow_id).cloned().collect();
        if definitions.is_empty() {
            debug!(workflow_id = %workflow_id, "No workflow matches trigger");
            return;
        }

        let matcher = RequirementMatcher::new(self.placeholder_source, self.registry.parameters());
        let body = Arc::new(payload.unwrap_or(Value::Null));

        for definition in definitions {
            if let Err(error) = matcher.check(&definition, Some(body.as_ref())) {
                warn!(workflow_id = %workflow_id, error = %error, "Trigger rejected");
                self.events.try_emit(
                    WORKFLOW_REJECTED,
                    Some(json!({
                        "workflow_id": workflow_id,
                        "field": error.field(),
                        "error": error.to_string(),
                    })),
                );
                continue;
            }

            info!(
                workflow_id = %workflow_id,
                roots = definition.stages().len(),
                "Workflow triggered {}",
                definition.label()
            );
            self.events.try_emit(
                WORKFLOW_TRIGGERED,
                Some(json!({"workflow_id": workflow_id, "roots": definition.stages().len()})),
            );

            let workflow = Arc::new(definition.info());
            for root in definition.stages() {
                self.dispatch(root.instantiate(), Value::Null, &body, &workflow);
            }
        }
    }

    /// Handles a completion or failure signal for `job_id`.
    ///
    /// Consumes the pending registration of the job. If the finished stage
    /// has a child for the signal's outcome, the child is dispatched with
    /// the result (or error) as its `previous` value.
    pub fn on_engine_signal(&self, job_id: StageId, signal: EngineSignal) {
        let outcome = signal.outcome();
        let previous = match signal {
            EngineSignal::Completed(result) => normalize_result(result),
            EngineSignal::Failed(error) => error,
        };

        let Some(child) = self.pending.take(job_id, outcome) else {
            debug!(job_id = %job_id, outcome = %outcome, "No continuation for finished job");
            self.events.try_emit(
                STAGE_TERMINAL,
                Some(json!({"job_id": job_id, "outcome": outcome})),
            );
            return;
        };

        debug!(
            job_id = %job_id,
            outcome = %outcome,
            stage = child.stage.name(),
            "Chaining child stage"
        );
        self.events.try_emit(
            STAGE_CHAINED,
            Some(json!({
                "workflow_id": child.workflow.id,
                "job_id": job_id,
                "outcome": outcome,
                "stage": child.stage.name(),
            })),
        );

        self.dispatch(child.stage, previous, &child.body, &child.workflow);
    }

    fn dispatch(&self, stage: Stage, previous: Value, body: &Arc<Value>, workflow: &Arc<WorkflowInfo>) {
        let job_id = stage.id();

        // Registered before submitting: the engine may signal before submit returns.
        self.pending.register(&stage, body, workflow);

        let submission = JobSubmission {
            job_id,
            job_type: stage.job().to_string(),
            context: ExecutionContext::new(body.as_ref().clone(), previous, workflow, &stage),
            options: SubmitOptions {
                priority: stage.priority(),
                repeat: stage.repeat().cloned(),
            },
            submitted_at: Utc::now(),
        };

        let event = json!({
            "workflow_id": workflow.id,
            "stage": stage.name(),
            "job": stage.job(),
            "job_id": job_id,
        });

        match self.engine.submit(submission) {
            Ok(()) => {
                info!(
                    workflow_id = %workflow.id,
                    job_id = %job_id,
                    stage = stage.name(),
                    priority = stage.priority(),
                    "Add job : {}",
                    stage.job()
                );
                self.events.try_emit(STAGE_DISPATCHED, Some(event));
            }
            Err(err) => {
                self.pending.discard(job_id);
                error!(
                    workflow_id = %workflow.id,
                    job_id = %job_id,
                    stage = stage.name(),
                    error = %err,
                    "Job submission failed"
                );
                let mut event = event;
                event["error"] = Value::String(err.to_string());
                self.events.try_emit(STAGE_DISPATCH_FAILED, Some(event));
            }
        }
    }
}

impl SignalHandler for ChainDispatcher {
    fn on_engine_signal(&self, job_id: StageId, signal: EngineSignal) {
        Self::on_engine_signal(self, job_id, signal);
    }
}

impl std::fmt::Debug for ChainDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainDispatcher")
            .field("workflows", &self.registry.len())
            .field("pending", &self.pending.len())
            .field("placeholder_source", &self.placeholder_source)
            .finish_non_exhaustive()
    }
}

/// `null` results become `{}` and strings holding JSON are decoded.
fn normalize_result(result: Value) -> Value {
    match result {
        Value::Null => Value::Object(Map::new()),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

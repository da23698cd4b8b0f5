//! Continuations waiting for their parent job to finish.

use super::context::WorkflowInfo;
use crate::utils::StageId;
use crate::workflow::{Outcome, Stage};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// A child stage instance waiting for its parent's outcome.
#[derive(Debug, Clone)]
pub struct PendingChild {
    /// Job id of the dispatched parent.
    pub parent_id: StageId,
    /// Which outcome of the parent runs this child.
    pub outcome: Outcome,
    /// The child instance, with its own descendants.
    pub stage: Stage,
    /// The trigger payload of the run.
    pub body: Arc<Value>,
    /// The workflow the run belongs to.
    pub workflow: Arc<WorkflowInfo>,
    /// When the parent was dispatched.
    pub registered_at: DateTime<Utc>,
}

/// Pending children keyed by parent job id.
///
/// Each branch is consumed only by its own outcome. A `failed` signal may be
/// followed by a retry of the same job, so it leaves the success branch in
/// place; a completion is final and drops whatever is left.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    entries: DashMap<StageId, Vec<PendingChild>>,
}

impl PendingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every child of `parent`. Returns how many were registered;
    /// a leaf registers nothing.
    pub fn register(&self, parent: &Stage, body: &Arc<Value>, workflow: &Arc<WorkflowInfo>) -> usize {
        let registered_at = Utc::now();
        let children: Vec<_> = [Outcome::Success, Outcome::Fail]
            .into_iter()
            .filter_map(|outcome| {
                parent.continuation(outcome).map(|c| PendingChild {
                    parent_id: c.parent_id,
                    outcome,
                    stage: c.stage.clone(),
                    body: Arc::clone(body),
                    workflow: Arc::clone(workflow),
                    registered_at,
                })
            })
            .collect();

        let count = children.len();
        if count > 0 {
            self.entries.insert(parent.id(), children);
        }
        count
    }

    /// Consumes the branch of `job_id` registered for `outcome`.
    ///
    /// [`Outcome::Success`] also drops the failure branch. [`Outcome::Fail`]
    /// keeps the success branch for a later retry of the job.
    pub fn take(&self, job_id: StageId, outcome: Outcome) -> Option<PendingChild> {
        if outcome == Outcome::Success {
            let (_, children) = self.entries.remove(&job_id)?;
            return children.into_iter().find(|c| c.outcome == outcome);
        }

        let child = {
            let mut children = self.entries.get_mut(&job_id)?;
            let index = children.iter().position(|c| c.outcome == outcome)?;
            children.swap_remove(index)
        };
        self.entries.remove_if(&job_id, |_, children| children.is_empty());
        Some(child)
    }

    /// Drops every registration made before `cutoff`. Returns how many
    /// parents were dropped.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, children| children.iter().any(|c| c.registered_at >= cutoff));
        before.saturating_sub(self.entries.len())
    }

    /// Drops the registrations of `job_id`. Returns true if any existed.
    pub fn discard(&self, job_id: StageId) -> bool {
        self.entries.remove(&job_id).is_some()
    }

    /// Returns true if `job_id` has registrations.
    #[must_use]
    pub fn contains(&self, job_id: StageId) -> bool {
        self.entries.contains_key(&job_id)
    }

    /// Returns the number of parents with registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

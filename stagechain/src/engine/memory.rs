//! In-process reference engine.
//!
//! Jobs are held in a priority queue (lower priority value first, FIFO
//! within a priority) and executed by tokio worker tasks. Nothing is
//! persisted and nothing is retried; a production deployment plugs a
//! durable engine into the same [`JobEngine`] seam.

use super::{EngineSignal, HandlerRegistry, JobEngine, JobSubmission, SignalHandler};
use crate::errors::EngineError;
use crate::utils::StageId;
use dashmap::DashSet;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct QueuedJob {
    seq: u64,
    submission: JobSubmission,
}

impl QueuedJob {
    const fn priority(&self) -> i32 {
        self.submission.options.priority
    }
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    // BinaryHeap pops the greatest element: invert both keys.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority()
            .cmp(&self.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    queue_name: String,
    queue: Mutex<BinaryHeap<QueuedJob>>,
    /// Ids queued or running; a job leaves once its signal is delivered.
    in_flight: DashSet<StageId>,
    seq: AtomicU64,
    notify: Notify,
    shut_down: AtomicBool,
    handlers: Arc<HandlerRegistry>,
    signals: RwLock<Option<Weak<dyn SignalHandler>>>,
}

impl Inner {
    fn pop(&self) -> Option<QueuedJob> {
        self.queue.lock().pop()
    }

    async fn execute(&self, job: QueuedJob) {
        let JobSubmission {
            job_id,
            job_type,
            context,
            ..
        } = job.submission;

        let signal = match self.handlers.get(&job_type) {
            None => EngineSignal::failed(format!("no handler registered for job type '{job_type}'")),
            Some(handler) => match AssertUnwindSafe(handler.handle(context)).catch_unwind().await {
                Ok(Ok(result)) => EngineSignal::Completed(result),
                Ok(Err(error)) => EngineSignal::Failed(Value::String(error.message)),
                Err(_) => EngineSignal::failed(format!("job handler for '{job_type}' panicked")),
            },
        };

        debug!(
            queue = %self.queue_name,
            job_id = %job_id,
            job_type = %job_type,
            outcome = %signal.outcome(),
            "Job finished"
        );

        let handler = self.signals.read().as_ref().and_then(Weak::upgrade);
        match handler {
            Some(handler) => handler.on_engine_signal(job_id, signal),
            None => warn!(job_id = %job_id, "no signal handler attached, dropping signal"),
        }
        self.in_flight.remove(&job_id);
    }
}

/// A tokio-backed, in-memory [`JobEngine`].
#[derive(Clone)]
pub struct InMemoryEngine {
    inner: Arc<Inner>,
}

impl InMemoryEngine {
    /// Creates an engine for `queue_name` running jobs with `handlers`.
    #[must_use]
    pub fn new(queue_name: impl Into<String>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue_name: queue_name.into(),
                queue: Mutex::new(BinaryHeap::new()),
                in_flight: DashSet::new(),
                seq: AtomicU64::new(0),
                notify: Notify::new(),
                shut_down: AtomicBool::new(false),
                handlers,
                signals: RwLock::new(None),
            }),
        }
    }

    /// Attaches the receiver of completion and failure signals.
    ///
    /// Held weakly, so the dispatcher can own the engine without a cycle.
    pub fn set_signal_handler(&self, handler: Weak<dyn SignalHandler>) {
        *self.inner.signals.write() = Some(handler);
    }

    /// Returns the queue name.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        &self.inner.queue_name
    }

    /// Returns the handler registry.
    #[must_use]
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.inner.handlers
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Returns the number of jobs queued or running.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Spawns a worker task that runs jobs until [`shutdown`] is called and
    /// the queue is drained.
    ///
    /// [`shutdown`]: Self::shutdown
    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            info!(queue = %inner.queue_name, "Job worker started");
            loop {
                if let Some(job) = inner.pop() {
                    inner.execute(job).await;
                    continue;
                }
                if inner.shut_down.load(AtomicOrdering::SeqCst) {
                    break;
                }
                inner.notify.notified().await;
            }
            info!(queue = %inner.queue_name, "Job worker stopped");
        })
    }

    /// Runs queued jobs on the current task until the queue is empty,
    /// including jobs chained while draining. Returns how many ran.
    pub async fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.inner.pop() {
            self.inner.execute(job).await;
            ran += 1;
        }
        ran
    }

    /// Stops accepting jobs and wakes idle workers so they can exit.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, AtomicOrdering::SeqCst);
        self.inner.notify.notify_waiters();
        self.inner.notify.notify_one();
    }
}

impl JobEngine for InMemoryEngine {
    fn submit(&self, submission: JobSubmission) -> Result<(), EngineError> {
        if self.inner.shut_down.load(AtomicOrdering::SeqCst) {
            return Err(EngineError::ShutDown);
        }

        if !self.inner.in_flight.insert(submission.job_id) {
            debug!(job_id = %submission.job_id, "duplicate job id ignored");
            return Ok(());
        }

        if submission.options.repeat.is_some() {
            debug!(job_id = %submission.job_id, "repeat hint ignored by in-memory engine");
        }

        let seq = self.inner.seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.inner.queue.lock().push(QueuedJob { seq, submission });
        self.inner.notify.notify_one();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEngine")
            .field("queue_name", &self.inner.queue_name)
            .field("pending", &self.pending_len())
            .finish()
    }
}

//! # Stagechain
//!
//! A declarative workflow orchestrator.
//!
//! Workflows are trees of named stages described in YAML. Each stage maps
//! to a job type and may branch into a follow-up stage on success or on
//! failure. A trigger (workflow id + payload) is validated against the
//! workflow's requirements, then its root stages are submitted to a job
//! engine. Each completion or failure signal from the engine dispatches the
//! child for that outcome, until a branch runs out of children.
//!
//! - **Parameters**: `%name%` and `%env(NAME)%` placeholders, resolved once
//! - **Requirements**: literal, membership and pattern checks on the payload
//! - **Chaining**: pending children keyed by unique per-dispatch job ids
//! - **Engines**: a [`JobEngine`](engine::JobEngine) seam plus an in-memory
//!   tokio engine for local runs and tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagechain::prelude::*;
//! use std::sync::Arc;
//!
//! let handlers = Arc::new(HandlerRegistry::new());
//! handlers.register_fn("message", |ctx: ExecutionContext| async move {
//!     Ok(ctx.data("message").cloned().unwrap_or_default())
//! });
//!
//! let engine = InMemoryEngine::new(DEFAULT_QUEUE_NAME, handlers);
//! let orchestrator = Orchestrator::builder()
//!     .with_config(OrchestratorConfig::from_env()?
//!         .with_workflows_directory("workflows")
//!         .with_jobs_directory("jobs"))
//!     .build(Arc::new(engine.clone()))?;
//! engine.set_signal_handler(orchestrator.signal_handler());
//! engine.spawn_worker();
//!
//! orchestrator.trigger("github-all", Some(payload));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod events;
pub mod loader;
pub mod observability;
pub mod orchestrator;
pub mod parameters;
pub mod requirements;
pub mod utils;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::OrchestratorConfig;
    pub use crate::dispatch::{ChainDispatcher, ExecutionContext, WorkflowInfo};
    pub use crate::engine::{
        EngineSignal, HandlerRegistry, InMemoryEngine, JobEngine, JobHandler, JobSubmission,
        SignalHandler, SubmitOptions, DEFAULT_QUEUE_NAME,
    };
    pub use crate::errors::{
        ConfigError, DefinitionError, EngineError, JobError, LoadError, RequirementError,
        StagechainError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
    pub use crate::parameters::{EnvSource, ParameterSet, ProcessEnv};
    pub use crate::requirements::PlaceholderSource;
    pub use crate::utils::StageId;
    pub use crate::workflow::{Outcome, Stage, WorkflowDefinition, WorkflowRegistry};
}

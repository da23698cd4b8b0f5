//! The assembled orchestrator.
//!
//! [`OrchestratorBuilder`] gathers parameters and workflow documents from
//! configured directories, dependency directories and in-memory documents,
//! builds the registry once, and hands it to a [`ChainDispatcher`].

use crate::config::OrchestratorConfig;
use crate::dispatch::ChainDispatcher;
use crate::engine::{HandlerRegistry, JobEngine, SignalHandler};
use crate::errors::Result;
use crate::events::{EventSink, NoOpEventSink};
use crate::loader::{load_parameters, load_workflow_documents, JobCatalog, UnresolvedJob};
use crate::parameters::{EnvSource, ParameterSet, ProcessEnv};
use crate::workflow::{LoadReport, WorkflowRegistry};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// Parameters file looked up inside a dependency directory.
pub const DEPENDENCY_PARAMETERS_FILE: &str = "parameters.yml";
/// Workflows directory looked up inside a dependency directory.
pub const DEPENDENCY_WORKFLOWS_DIR: &str = "workflows";

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: Option<OrchestratorConfig>,
    dependencies: Vec<PathBuf>,
    documents: Vec<(String, Value)>,
    parameters: ParameterSet,
    events: Arc<dyn EventSink>,
    handlers: Option<Arc<HandlerRegistry>>,
    env: Box<dyn EnvSource>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            config: None,
            dependencies: Vec::new(),
            documents: Vec::new(),
            parameters: ParameterSet::new(),
            events: Arc::new(NoOpEventSink),
            handlers: None,
            env: Box::new(ProcessEnv),
        }
    }
}

impl OrchestratorBuilder {
    /// Uses `config` for directories and dispatch settings. The
    /// configuration is validated by [`build`](Self::build).
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds a dependency directory holding `parameters.yml` and/or a
    /// `workflows/` tree. Either may be absent.
    #[must_use]
    pub fn with_dependencies(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dependencies.push(dir.into());
        self
    }

    /// Adds already parsed workflow documents, each with a source label.
    #[must_use]
    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.documents
            .extend(documents.into_iter().map(|(source, doc)| (source.into(), doc)));
        self
    }

    /// Adds parameters on top of those read from files.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Sets the event sink given to the dispatcher.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the handlers used to report stages with no runnable job.
    #[must_use]
    pub fn with_handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Sets the environment used for `%env(NAME)%` parameters.
    #[must_use]
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Loads everything and wires the dispatcher to `engine`.
    ///
    /// All parameter sources are merged before any workflow is loaded, so
    /// every stage resolves against the complete set. Rejected workflow
    /// documents do not fail the build; they are listed in the
    /// [`LoadReport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or a configured
    /// directory or parameters file cannot be read.
    pub fn build(self, engine: Arc<dyn JobEngine>) -> Result<Orchestrator> {
        let has_injected = !self.dependencies.is_empty() || !self.documents.is_empty();
        if let Some(config) = &self.config {
            config.validate_for(has_injected)?;
        }
        let config = self.config.unwrap_or_default();

        let mut parameters = ParameterSet::new();
        if let Some(path) = &config.parameters {
            parameters.extend(load_parameters(path, self.env.as_ref())?);
        }
        for dir in &self.dependencies {
            let path = dir.join(DEPENDENCY_PARAMETERS_FILE);
            if path.is_file() {
                parameters.extend(load_parameters(&path, self.env.as_ref())?);
            }
        }
        parameters.extend(self.parameters);

        let mut registry = WorkflowRegistry::new(parameters);
        let mut report = LoadReport::default();

        if let Some(dir) = &config.workflows_directory {
            report.merge(registry.load(load_workflow_documents(dir)?));
        }
        for dir in &self.dependencies {
            let workflows = dir.join(DEPENDENCY_WORKFLOWS_DIR);
            if workflows.is_dir() {
                report.merge(registry.load(load_workflow_documents(&workflows)?));
            } else {
                warn!(directory = %dir.display(), "Dependency has no workflows directory");
            }
        }
        report.merge(registry.load(self.documents));

        let catalog = config
            .jobs_directory
            .as_deref()
            .map(JobCatalog::discover)
            .transpose()?;

        let unresolved = match (&catalog, &self.handlers) {
            (Some(catalog), Some(handlers)) => catalog.unresolved(&registry, handlers),
            (None, Some(handlers)) => JobCatalog::default().unresolved(&registry, handlers),
            _ => Vec::new(),
        };

        info!(
            workflows = registry.len(),
            rejected = report.rejected.len(),
            queue = %config.queue_name,
            "Orchestrator ready"
        );

        let dispatcher = ChainDispatcher::new(Arc::new(registry), engine)
            .with_event_sink(self.events)
            .with_placeholder_source(config.placeholder_source);

        Ok(Orchestrator {
            config,
            dispatcher: Arc::new(dispatcher),
            catalog,
            report,
            unresolved,
        })
    }
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("config", &self.config)
            .field("dependencies", &self.dependencies)
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

/// A loaded workflow registry bound to a job engine.
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    dispatcher: Arc<ChainDispatcher>,
    catalog: Option<JobCatalog>,
    report: LoadReport,
    unresolved: Vec<UnresolvedJob>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Triggers every workflow with id `workflow_id`.
    pub fn trigger(&self, workflow_id: &str, payload: Option<Value>) {
        self.dispatcher.trigger(workflow_id, payload);
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<ChainDispatcher> {
        &self.dispatcher
    }

    /// Returns a weak handle to the dispatcher, for engines that deliver
    /// signals to a [`SignalHandler`].
    #[must_use]
    pub fn signal_handler(&self) -> Weak<dyn SignalHandler> {
        let weak: Weak<ChainDispatcher> = Arc::downgrade(&self.dispatcher);
        weak
    }

    /// Returns the workflow registry.
    #[must_use]
    pub fn registry(&self) -> &WorkflowRegistry {
        self.dispatcher.registry()
    }

    /// Returns the effective configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the job catalog, if a jobs directory was configured.
    #[must_use]
    pub const fn catalog(&self) -> Option<&JobCatalog> {
        self.catalog.as_ref()
    }

    /// Returns which documents were loaded and which were rejected.
    #[must_use]
    pub const fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Returns stages whose job has no handler and no catalog entry.
    #[must_use]
    pub fn unresolved_jobs(&self) -> &[UnresolvedJob] {
        &self.unresolved
    }

    /// Returns true if `dir` holds a dependency layout.
    #[must_use]
    pub fn is_dependency_dir(dir: &Path) -> bool {
        dir.join(DEPENDENCY_PARAMETERS_FILE).is_file() || dir.join(DEPENDENCY_WORKFLOWS_DIR).is_dir()
    }
}

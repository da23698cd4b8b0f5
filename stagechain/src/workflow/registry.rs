//! Registry of loaded workflow definitions.

use super::config::WorkflowDocument;
use super::definition::WorkflowDefinition;
use crate::errors::DefinitionError;
use crate::parameters::ParameterSet;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// A document that was excluded from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedDefinition {
    /// Where the document came from.
    pub source: String,
    /// Why it was rejected.
    pub error: String,
}

/// Outcome of a [`WorkflowRegistry::load`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Ids of the definitions that were registered.
    pub loaded: Vec<String>,
    /// Documents that were excluded.
    pub rejected: Vec<RejectedDefinition>,
}

impl LoadReport {
    /// Returns true if every document was registered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.loaded.extend(other.loaded);
        self.rejected.extend(other.rejected);
    }
}

/// Holds the global parameters and every registered workflow.
///
/// Constructed once by the caller and shared by handle with the dispatcher.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    parameters: ParameterSet,
    workflows: Vec<Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    /// Creates an empty registry using `parameters` for stage data.
    #[must_use]
    pub fn new(parameters: ParameterSet) -> Self {
        Self {
            parameters,
            workflows: Vec::new(),
        }
    }

    /// Loads raw documents, each paired with the name of its source.
    ///
    /// A malformed document is logged and skipped; it never prevents its
    /// siblings from registering. Loading the same source twice is rejected
    /// per document as a duplicate id.
    pub fn load<I, S>(&mut self, documents: I) -> LoadReport
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut report = LoadReport::default();

        for (source, raw) in documents {
            let source = source.into();
            let result = serde_json::from_value::<WorkflowDocument>(raw)
                .map_err(|e| DefinitionError::Malformed {
                    source_name: source.clone(),
                    message: e.to_string(),
                })
                .and_then(|doc| self.register(doc, &source));

            match result {
                Ok(id) => report.loaded.push(id),
                Err(error) => {
                    warn!(source = %source, error = %error, "workflow rejected");
                    report.rejected.push(RejectedDefinition {
                        source,
                        error: error.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Validates and registers a single typed document.
    ///
    /// # Errors
    ///
    /// Returns the [`DefinitionError`] that excluded the document.
    pub fn register(
        &mut self,
        doc: WorkflowDocument,
        source: &str,
    ) -> Result<String, DefinitionError> {
        let definition = WorkflowDefinition::build(doc, source, &self.parameters)?;

        if self.get(definition.id()).is_some() {
            return Err(DefinitionError::DuplicateId {
                workflow_id: definition.id().to_string(),
            });
        }

        info!(
            workflow_id = definition.id(),
            "Workflow added {} ({})",
            definition.label(),
            definition.id()
        );
        let id = definition.id().to_string();
        self.workflows.push(Arc::new(definition));
        Ok(id)
    }

    /// Gets a workflow by id.
    #[must_use]
    pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows
            .iter()
            .find(|w| w.id() == workflow_id)
            .cloned()
    }

    /// Returns every registered workflow.
    #[must_use]
    pub fn all(&self) -> &[Arc<WorkflowDefinition>] {
        &self.workflows
    }

    /// Iterates the workflows whose id equals `workflow_id`.
    pub fn matching<'a>(
        &'a self,
        workflow_id: &'a str,
    ) -> impl Iterator<Item = &'a Arc<WorkflowDefinition>> + 'a {
        self.workflows.iter().filter(move |w| w.id() == workflow_id)
    }

    /// Returns the global parameters.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Merges additional parameters. Only workflows loaded afterwards see
    /// them; existing stage data is never re-resolved.
    pub fn extend_parameters(&mut self, parameters: ParameterSet) {
        self.parameters.extend(parameters);
    }

    /// Returns the number of registered workflows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Returns true if no workflow is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

//! Workflow documents, stage trees and the workflow registry.
//!
//! This module provides:
//! - Raw deserializable documents ([`WorkflowDocument`])
//! - The recursive [`Stage`] tree built from them
//! - Validated [`WorkflowDefinition`]s
//! - The [`WorkflowRegistry`] indexing definitions by id

mod config;
mod definition;
mod registry;
mod stage;

pub use config::{RequirementsConfig, StageConfig, StageData, StagesConfig, WorkflowDocument};
pub use definition::WorkflowDefinition;
pub use registry::{LoadReport, RejectedDefinition, WorkflowRegistry};
pub use stage::{ChildStage, Outcome, Stage, DEFAULT_PRIORITY};

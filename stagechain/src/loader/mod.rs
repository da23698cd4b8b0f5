//! Reading workflow and parameter documents from disk.
//!
//! Parsing only produces raw values; shape validation happens when the
//! documents are handed to [`WorkflowRegistry::load`](crate::workflow::WorkflowRegistry::load).

mod catalog;

pub use catalog::{JobCatalog, UnresolvedJob};

use crate::errors::LoadError;
use crate::parameters::{EnvSource, ParameterSet, ParametersDocument};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name that marks a workflow directory.
pub const WORKFLOW_FILE_NAME: &str = "workflow.yml";

/// Parses a YAML document into a JSON value.
///
/// `origin` names the document in errors.
pub fn parse_yaml(content: &str, origin: &Path) -> Result<Value, LoadError> {
    serde_yaml_ng::from_str(content).map_err(|e| LoadError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Reads and parses a YAML file.
pub fn read_yaml(path: &Path) -> Result<Value, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    parse_yaml(&content, path)
}

/// Finds every workflow file under `dir`.
///
/// A `workflow.yml` directly inside a directory is taken as a workflow, and
/// every subdirectory is searched the same way. Results are sorted.
pub fn discover_workflow_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    collect_workflow_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_workflow_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let candidate = dir.join(WORKFLOW_FILE_NAME);
    if candidate.is_file() {
        files.push(candidate);
    }

    let entries = fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
        if path.is_dir() {
            collect_workflow_files(&path, files)?;
        }
    }
    Ok(())
}

/// Reads every workflow document under `dir`, paired with its path.
///
/// A file that cannot be read or parsed is logged and skipped.
pub fn load_workflow_documents(dir: &Path) -> Result<Vec<(String, Value)>, LoadError> {
    let files = discover_workflow_files(dir)?;
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        match read_yaml(&path) {
            Ok(value) => {
                debug!(path = %path.display(), "Workflow file read");
                documents.push((path.display().to_string(), value));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable workflow file"),
        }
    }

    info!(
        directory = %dir.display(),
        count = documents.len(),
        "Loaded {} workflow documents",
        documents.len()
    );
    Ok(documents)
}

/// Loads the global parameters file, resolving `%env(NAME)%` against `env`.
///
/// A missing file yields an empty set and a warning.
pub fn load_parameters(path: &Path, env: &dyn EnvSource) -> Result<ParameterSet, LoadError> {
    if !path.exists() {
        warn!(path = %path.display(), "Parameters file not found, continuing without parameters");
        return Ok(ParameterSet::new());
    }

    let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let document = if content.trim().is_empty() {
        ParametersDocument::default()
    } else {
        parse_parameters(&content, path)?
    };

    let parameters = ParameterSet::from_document(document, env);
    info!(path = %path.display(), count = parameters.len(), "Parameters loaded");
    Ok(parameters)
}

fn parse_parameters(content: &str, path: &Path) -> Result<ParametersDocument, LoadError> {
    match parse_yaml(content, path)? {
        Value::Null => Ok(ParametersDocument::default()),
        value => serde_json::from_value(value).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

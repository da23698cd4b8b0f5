//! Job type discovery from a jobs directory.

use crate::engine::HandlerRegistry;
use crate::errors::LoadError;
use crate::workflow::WorkflowRegistry;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A stage whose job type has neither a handler nor a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedJob {
    /// The workflow id.
    pub workflow_id: String,
    /// The stage name.
    pub stage: String,
    /// The job type.
    pub job: String,
}

/// Job type names found under a jobs directory.
///
/// A file `sub/name.ext` declares the job type `sub/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCatalog {
    root: PathBuf,
    jobs: BTreeSet<String>,
}

impl JobCatalog {
    /// Scans `jobs_dir` recursively.
    pub fn discover(jobs_dir: &Path) -> Result<Self, LoadError> {
        let mut jobs = BTreeSet::new();
        collect_jobs(jobs_dir, jobs_dir, &mut jobs)?;
        for job in &jobs {
            debug!(job = %job, "Job processed : {}", job);
        }
        Ok(Self {
            root: jobs_dir.to_path_buf(),
            jobs,
        })
    }

    /// Returns the scanned directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if `job` was found.
    #[must_use]
    pub fn contains(&self, job: &str) -> bool {
        self.jobs.contains(job)
    }

    /// Iterates job type names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(String::as_str)
    }

    /// Returns the number of job types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if no job type was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Lists every stage in `registry` whose job has no handler in
    /// `handlers` and no entry in this catalog. Each is logged at warn.
    pub fn unresolved(&self, registry: &WorkflowRegistry, handlers: &HandlerRegistry) -> Vec<UnresolvedJob> {
        let mut unresolved = Vec::new();
        for workflow in registry.all() {
            for stage in workflow.stages().iter().flat_map(|root| root.walk()) {
                if handlers.contains(stage.job()) || self.contains(stage.job()) {
                    continue;
                }
                warn!(
                    workflow_id = workflow.id(),
                    stage = stage.name(),
                    job = stage.job(),
                    "No handler for job {}",
                    stage.job()
                );
                unresolved.push(UnresolvedJob {
                    workflow_id: workflow.id().to_string(),
                    stage: stage.name().to_string(),
                    job: stage.job().to_string(),
                });
            }
        }
        unresolved
    }
}

fn collect_jobs(root: &Path, dir: &Path, jobs: &mut BTreeSet<String>) -> Result<(), LoadError> {
    let entries = fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
        if path.is_dir() {
            collect_jobs(root, &path, jobs)?;
        } else if let Some(name) = job_name(root, &path) {
            jobs.insert(name);
        }
    }
    Ok(())
}

fn job_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ExecutionContext;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn jobs_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("message.js"), "").unwrap();
        fs::create_dir_all(tmp.path().join("github")).unwrap();
        fs::write(tmp.path().join("github/comment.js"), "").unwrap();
        tmp
    }

    #[test]
    fn test_discover_names_from_relative_paths() {
        let tmp = jobs_dir();
        let catalog = JobCatalog::discover(tmp.path()).unwrap();

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["github/comment", "message"]);
        assert!(catalog.contains("message"));
        assert!(!catalog.contains("message.js"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.root(), tmp.path());
    }

    #[test]
    fn test_discover_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(JobCatalog::discover(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_unresolved_jobs() {
        let tmp = jobs_dir();
        let catalog = JobCatalog::discover(tmp.path()).unwrap();

        let mut registry = WorkflowRegistry::default();
        registry.load(vec![(
            "wf.yml",
            json!({
                "id": "wf",
                "stages": [{"a": {
                    "job": "message",
                    "on_success": {"name": "b", "job": "inline"},
                    "on_fail": {"name": "c", "job": "ghost"}
                }}]
            }),
        )]);

        let handlers = HandlerRegistry::new();
        handlers.register_fn("inline", |_ctx: ExecutionContext| async move { Ok(Value::Null) });

        assert_eq!(
            catalog.unresolved(&registry, &handlers),
            vec![UnresolvedJob {
                workflow_id: "wf".to_string(),
                stage: "c".to_string(),
                job: "ghost".to_string(),
            }]
        );
    }
}

//! Orchestrator configuration.

use crate::engine::DEFAULT_QUEUE_NAME;
use crate::errors::ConfigError;
use crate::observability::LogFormat;
use crate::parameters::{EnvSource, ProcessEnv};
use crate::requirements::PlaceholderSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Redis host used when none is configured.
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
/// Redis port used when none is configured.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Settings for loading workflows and reaching the job engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Directory scanned for `workflow.yml` files.
    #[serde(default)]
    pub workflows_directory: Option<PathBuf>,
    /// Directory holding job implementations, one file per job type.
    #[serde(default)]
    pub jobs_directory: Option<PathBuf>,
    /// Global parameters file. Must be YAML.
    #[serde(default)]
    pub parameters: Option<PathBuf>,
    /// Engine host.
    #[serde(default)]
    pub redis_host: Option<String>,
    /// Engine port.
    #[serde(default)]
    pub redis_port: Option<u16>,
    /// Engine queue name.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Where requirement pattern placeholders are resolved from.
    #[serde(default)]
    pub placeholder_source: PlaceholderSource,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_queue_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workflows_directory: None,
            jobs_directory: None,
            parameters: None,
            redis_host: None,
            redis_port: None,
            queue_name: default_queue_name(),
            placeholder_source: PlaceholderSource::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workflows directory.
    #[must_use]
    pub fn with_workflows_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workflows_directory = Some(dir.into());
        self
    }

    /// Sets the jobs directory.
    #[must_use]
    pub fn with_jobs_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.jobs_directory = Some(dir.into());
        self
    }

    /// Sets the parameters file.
    #[must_use]
    pub fn with_parameters(mut self, path: impl Into<PathBuf>) -> Self {
        self.parameters = Some(path.into());
        self
    }

    /// Sets the queue name.
    #[must_use]
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Sets the placeholder source.
    #[must_use]
    pub const fn with_placeholder_source(mut self, source: PlaceholderSource) -> Self {
        self.placeholder_source = source;
        self
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(&ProcessEnv)
    }

    /// Overlays `REDIS_HOST`, `REDIS_PORT` and `QUEUE_NAME` from `env`.
    pub fn with_env(mut self, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        if let Some(host) = env.var("REDIS_HOST") {
            self.redis_host = Some(host);
        }
        if let Some(port) = env.var("REDIS_PORT") {
            let parsed = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "REDIS_PORT".to_string(),
                value: port.clone(),
            })?;
            self.redis_port = Some(parsed);
        }
        if let Some(queue) = env.var("QUEUE_NAME") {
            self.queue_name = queue;
        }
        Ok(self)
    }

    /// Checks that the required paths are present and well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(false)
    }

    /// Like [`validate`](Self::validate), but a workflows directory is
    /// optional when workflows come from injected dependencies.
    pub(crate) fn validate_for(&self, has_dependencies: bool) -> Result<(), ConfigError> {
        if let Some(parameters) = &self.parameters {
            if !is_yaml(parameters) {
                return Err(ConfigError::ParametersNotYaml(parameters.display().to_string()));
            }
        }
        if !has_dependencies && self.workflows_directory.is_none() {
            return Err(ConfigError::MissingWorkflowsDirectory);
        }
        if self.jobs_directory.is_none() {
            return Err(ConfigError::MissingJobsDirectory);
        }
        Ok(())
    }

    /// Returns the engine host, warning when it falls back to the default.
    pub fn redis_host(&self) -> &str {
        self.redis_host.as_deref().unwrap_or_else(|| {
            warn!("Redis host not set, falling back to {DEFAULT_REDIS_HOST}");
            DEFAULT_REDIS_HOST
        })
    }

    /// Returns the engine port, warning when it falls back to the default.
    pub fn redis_port(&self) -> u16 {
        self.redis_port.unwrap_or_else(|| {
            warn!("Redis port not set, falling back to {DEFAULT_REDIS_PORT}");
            DEFAULT_REDIS_PORT
        })
    }

    /// Renders the engine connection URL.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host(), self.redis_port())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn valid() -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_workflows_directory("example/workflows")
            .with_jobs_directory("example/jobs")
    }

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.queue_name, "global-jobs");
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379");
        assert_eq!(config.placeholder_source, PlaceholderSource::Payload);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(valid().with_parameters("params.yaml").validate().is_ok());

        assert_eq!(
            OrchestratorConfig::new().with_jobs_directory("jobs").validate(),
            Err(ConfigError::MissingWorkflowsDirectory)
        );
        assert_eq!(
            OrchestratorConfig::new().with_workflows_directory("wf").validate(),
            Err(ConfigError::MissingJobsDirectory)
        );
        assert_eq!(
            valid().with_parameters("params.json").validate(),
            Err(ConfigError::ParametersNotYaml("params.json".to_string()))
        );
    }

    #[test]
    fn test_dependencies_make_workflows_directory_optional() {
        let config = OrchestratorConfig::new().with_jobs_directory("jobs");
        assert!(config.validate_for(true).is_ok());
        assert!(config.validate_for(false).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<String, String> = [
            ("REDIS_HOST".to_string(), "redis.internal".to_string()),
            ("REDIS_PORT".to_string(), "6380".to_string()),
            ("QUEUE_NAME".to_string(), "hooks".to_string()),
        ]
        .into_iter()
        .collect();

        let config = valid().with_env(&env).unwrap();
        assert_eq!(config.redis_url(), "redis://redis.internal:6380");
        assert_eq!(config.queue_name, "hooks");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let env: HashMap<String, String> =
            [("REDIS_PORT".to_string(), "not-a-port".to_string())].into_iter().collect();
        assert_eq!(
            valid().with_env(&env),
            Err(ConfigError::InvalidEnv {
                key: "REDIS_PORT".to_string(),
                value: "not-a-port".to_string(),
            })
        );
    }

    #[test]
    fn test_deserialize_yaml() {
        let config: OrchestratorConfig = serde_yaml_ng::from_str(
            "workflows_directory: ./workflows\njobs_directory: ./jobs\nredis_port: 6390\nplaceholder_source: parameters\n",
        )
        .unwrap();
        assert_eq!(config.workflows_directory, Some(PathBuf::from("./workflows")));
        assert_eq!(config.redis_port(), 6390);
        assert_eq!(config.queue_name, "global-jobs");
        assert_eq!(config.placeholder_source, PlaceholderSource::Parameters);
    }
}

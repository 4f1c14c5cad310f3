//! Loaders for `etc/agents.yaml` and `etc/workflow.yaml`, the way
//! `WorkflowLoader::load_from_file`/`load_from_str` parse YAML in
//! `ob-workflow/src/definition.rs`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

fn default_max_attempts() -> u32 {
    3
}

fn default_run_lock_ttl_seconds() -> u64 {
    300
}

/// `etc/agents.yaml`: the allowed agent names the turn engine may invoke.
/// An empty or missing file falls back to `["claude"]`, the builtin
/// default the spec names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default = "default_agent_names")]
    pub agent_names: Vec<String>,
}

fn default_agent_names() -> Vec<String> {
    vec!["claude".to_string()]
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            agent_names: default_agent_names(),
        }
    }
}

impl AgentsConfig {
    pub fn allows(&self, agent_name: &str) -> bool {
        self.agent_names.iter().any(|n| n == agent_name)
    }

    /// Load from a file; a missing file is the builtin default, not an
    /// error (agents.yaml is documented as optional).
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Self::load_from_str(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_from_str(body: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(body)?)
    }
}

/// `etc/workflow.yaml`: the workflow step definitions. Required keys
/// (`steps`) surface `ConfigError` when absent or malformed; optional
/// keys default the way `WorkflowDefinition` defaults `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    pub steps: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_run_lock_ttl_seconds")]
    pub run_lock_ttl_seconds: u64,
    #[serde(default)]
    pub description: String,
}

impl WorkflowConfig {
    /// Unlike `agents.yaml`, `workflow.yaml` is validated — a missing
    /// file is a `ConfigError`, not a silent default.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let body = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::ConfigError(format!("{} not found", path.display()))
            } else {
                EngineError::Io(e)
            }
        })?;
        Self::load_from_str(&body)
    }

    pub fn load_from_str(body: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(body).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        if config.steps.is_empty() {
            return Err(EngineError::ConfigError("workflow.yaml: steps must not be empty".into()));
        }
        Ok(config)
    }
}

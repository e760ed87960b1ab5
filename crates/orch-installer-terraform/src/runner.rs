//! Module runner contract
//!
//! Steps apply or destroy infrastructure modules through a [`ModuleRunner`].
//! A run must be idempotent: running the same input twice is a no-op the
//! second time.

use crate::error::{Result, TerraformError};
use async_trait::async_trait;
use orch_installer_config::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Remote state location of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub region: String,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    pub action: Action,
    pub module_path: PathBuf,
    /// Serialized as-is into the module's variable file
    pub variables: serde_json::Value,
    /// Remote state. Mutually exclusive with `state`.
    pub backend_config: Option<BackendConfig>,
    /// Local state blob for stateless runs; empty on the first run.
    pub state: Option<String>,
    pub log_file: PathBuf,
    pub keep_generated_files: bool,
    /// Restrict a destroy to one resource address
    pub destroy_target: Option<String>,
    pub dry_run: bool,
}

impl RunInput {
    pub fn new(action: Action, module_path: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            action,
            module_path: module_path.into(),
            variables: serde_json::Value::Null,
            backend_config: None,
            state: None,
            log_file: log_file.into(),
            keep_generated_files: false,
            destroy_target: None,
            dry_run: false,
        }
    }

    pub fn is_destroy(&self) -> bool {
        self.action == Action::Uninstall
    }
}

/// One module output as printed by `terraform output -json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    #[serde(default)]
    pub sensitive: bool,
    #[serde(rename = "type", default)]
    pub value_type: serde_json::Value,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    pub outputs: BTreeMap<String, OutputValue>,
    /// Local state after the run. Empty when a backend is configured.
    pub state: String,
}

impl RunOutput {
    pub fn string(&self, name: &str) -> Option<String> {
        self.outputs
            .get(name)
            .and_then(|o| o.value.as_str())
            .map(str::to_string)
    }

    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        let values = self.outputs.get(name)?.value.as_array()?;
        values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveStatesInput {
    pub module_path: PathBuf,
    /// Old resource address to new resource address
    pub states: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveStatesInput {
    pub module_path: PathBuf,
    pub states: Vec<String>,
}

#[async_trait]
pub trait ModuleRunner: Send + Sync {
    /// Apply (install, upgrade) or destroy (uninstall) a module.
    async fn run(&self, ctx: &CancellationToken, input: &RunInput) -> Result<RunOutput>;

    /// Re-parent resources when a module layout changes.
    async fn move_states(&self, ctx: &CancellationToken, input: &MoveStatesInput) -> Result<()>;

    /// Forget resources that no longer belong to a module.
    async fn remove_states(&self, ctx: &CancellationToken, input: &RemoveStatesInput)
    -> Result<()>;
}

pub fn validate_input(input: &RunInput) -> Result<()> {
    let invalid = |msg: &str| Err(TerraformError::InvalidInput(msg.to_string()));

    if input.module_path.as_os_str().is_empty() {
        return invalid("module path must be specified");
    }
    if input.variables.is_null() {
        return invalid("variables must be specified");
    }
    if input.log_file.as_os_str().is_empty() {
        return invalid("log file must be specified");
    }
    match (&input.backend_config, &input.state) {
        (Some(_), Some(_)) => {
            invalid("either backend config or terraform state must be specified, not both")
        }
        (None, None) => invalid("either backend config or terraform state must be specified"),
        _ => Ok(()),
    }
}

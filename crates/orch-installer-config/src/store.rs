//! Reading and writing the config and runtime state files

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::runtime_state::RuntimeState;
use std::path::{Path, PathBuf};

/// Storage for the user config and the runtime state
pub trait ConfigStore {
    fn read_config(&self) -> Result<Config>;
    fn write_config(&self, config: &Config) -> Result<()>;
    fn read_runtime_state(&self) -> Result<RuntimeState>;
    fn write_runtime_state(&self, state: &RuntimeState) -> Result<()>;
}

/// File-backed store. Both files are YAML.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    config_path: PathBuf,
    runtime_state_path: PathBuf,
}

impl FileConfigStore {
    pub fn new(config_path: impl AsRef<Path>, runtime_state_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            runtime_state_path: runtime_state_path.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn runtime_state_path(&self) -> &Path {
        &self.runtime_state_path
    }

    /// Read the runtime state, or `None` if no previous run left one behind.
    pub fn read_runtime_state_if_exists(&self) -> Result<Option<RuntimeState>> {
        if !self.runtime_state_path.exists() {
            return Ok(None);
        }
        self.read_runtime_state().map(Some)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

impl ConfigStore for FileConfigStore {
    fn read_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let content = std::fs::read_to_string(&self.config_path)?;
        let config = Config::from_yaml(&content)?;
        tracing::debug!("Loaded config from {}", self.config_path.display());
        Ok(config)
    }

    fn write_config(&self, config: &Config) -> Result<()> {
        write_file(&self.config_path, &config.to_yaml()?)
    }

    fn read_runtime_state(&self) -> Result<RuntimeState> {
        let content = std::fs::read_to_string(&self.runtime_state_path)?;
        let state = RuntimeState::from_yaml(&content)?;
        tracing::debug!(
            "Loaded runtime state from {}",
            self.runtime_state_path.display()
        );
        Ok(state)
    }

    fn write_runtime_state(&self, state: &RuntimeState) -> Result<()> {
        write_file(&self.runtime_state_path, &state.to_yaml()?)
    }
}

//! Durable storage of the runtime state
//!
//! The stage writes the runtime state after every step phase so an
//! interrupted run can resume. Any failure is reported as
//! `StatePersistenceFailed`, which aborts the stage and the installer.

use crate::error::StepError;
use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Object key and default file name of the persisted runtime state
pub const RUNTIME_STATE_KEY: &str = "runtime-state.yaml";

#[async_trait]
pub trait StatePersister: Send + Sync {
    async fn persist(&self, config: &Config, rs: &RuntimeState) -> Result<(), StepError>;
}

/// Writes the runtime state to a local file, keeping the previous copy
/// next to it with a `.backup` suffix.
///
/// Point it at the same file the next run resumes from.
#[derive(Debug, Clone)]
pub struct FileStatePersister {
    path: PathBuf,
}

impl FileStatePersister {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(RUNTIME_STATE_KEY));
        name.push(".backup");
        self.path.with_file_name(name)
    }

    async fn save(&self, content: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
                tracing::debug!("Created state directory: {}", dir.display());
            }
        }

        let backup = self.backup_path();
        if self.path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&self.path, &backup).await?;
        }

        fs::write(&self.path, content).await
    }
}

#[async_trait]
impl StatePersister for FileStatePersister {
    async fn persist(&self, _config: &Config, rs: &RuntimeState) -> Result<(), StepError> {
        let content = rs.to_yaml().map_err(|e| {
            StepError::persistence(format!("failed to serialize runtime state: {e}"))
        })?;
        self.save(&content).await.map_err(|e| {
            StepError::persistence(format!(
                "failed to write {}: {e}",
                self.state_path().display()
            ))
        })?;
        tracing::debug!("Saved runtime state to {}", self.state_path().display());
        Ok(())
    }
}

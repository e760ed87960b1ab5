//! Module runner error types

use orch_installer_core::StepError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terraform {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("terraform {0} cancelled")]
    Cancelled(String),

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TerraformError> for StepError {
    fn from(err: TerraformError) -> Self {
        match err {
            TerraformError::InvalidInput(msg) => StepError::invalid_argument(msg),
            TerraformError::Spawn { .. }
            | TerraformError::CommandFailed { .. }
            | TerraformError::Cancelled(_) => StepError::external_tool(err.to_string()),
            TerraformError::WriteFile { .. } | TerraformError::Io(_) | TerraformError::Json(_) => {
                StepError::internal(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TerraformError>;

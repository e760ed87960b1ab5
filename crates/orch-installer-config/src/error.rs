use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Whether the error stems from user-supplied input rather than a bug.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

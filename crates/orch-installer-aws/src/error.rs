//! AWS helper error types

use orch_installer_core::StepError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation} failed: {message}")]
    Api { operation: String, message: String },

    #[error("cannot get three AWS availability zones from region {region}")]
    NotEnoughZones { region: String, found: usize },

    #[error("S3 bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to generate SSH key: {0}")]
    SshKey(String),
}

impl AwsError {
    pub(crate) fn api(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

impl From<AwsError> for StepError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::InvalidArgument(msg) => StepError::invalid_argument(msg),
            other => StepError::internal(other.to_string()),
        }
    }
}

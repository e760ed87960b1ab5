//! Installer error types

use orch_installer_config::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error kind shared by steps, stages and the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unknown,
    /// Serialization, filesystem or marshalling failure inside the installer
    Internal,
    /// Bad user-supplied data
    InvalidArgument,
    /// A field an upstream step should have produced is missing
    InvalidRuntimeState,
    /// The module runner or another external tool failed
    ExternalTool,
    StatePersistenceFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Unknown => "unknown",
            ErrorKind::Internal => "internal",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidRuntimeState => "invalid runtime state",
            ErrorKind::ExternalTool => "external tool",
            ErrorKind::StatePersistenceFailed => "state persistence failed",
        };
        f.write_str(s)
    }
}

/// Error returned by a single step phase
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn invalid_runtime_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRuntimeState, message)
    }

    pub fn external_tool(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalTool, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StatePersistenceFailed, message)
    }
}

impl From<ConfigError> for StepError {
    fn from(err: ConfigError) -> Self {
        let kind = if err.is_user_error() {
            ErrorKind::InvalidArgument
        } else {
            ErrorKind::Internal
        };
        Self::new(kind, err.to_string())
    }
}

/// Step errors of one stage, keyed by step name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
    pub step_errors: BTreeMap<String, StepError>,
}

impl StageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            step_errors: BTreeMap::new(),
        }
    }

    /// Aggregate the errors recorded while running a stage. `kind` is the
    /// kind of the first error recorded.
    pub fn from_step_errors(kind: ErrorKind, step_errors: BTreeMap<String, StepError>) -> Self {
        let names: Vec<&str> = step_errors.keys().map(String::as_str).collect();
        let message = format!("{} step(s) failed: {}", names.len(), names.join(", "));
        Self {
            kind,
            message,
            step_errors,
        }
    }

    /// A runtime state write failed while `step` was running.
    pub fn persistence(step: &str, err: StepError) -> Self {
        let message = format!("failed to persist runtime state during step {step}");
        let mut step_errors = BTreeMap::new();
        step_errors.insert(step.to_string(), err);
        Self {
            kind: ErrorKind::StatePersistenceFailed,
            message,
            step_errors,
        }
    }
}

/// Error returned by [`crate::Installer::run`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InstallerError {
    pub kind: ErrorKind,
    pub message: String,
    /// Stage that failed, if any stage ran
    pub stage: Option<String>,
    pub step_errors: BTreeMap<String, StepError>,
}

impl InstallerError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            message: message.into(),
            stage: None,
            step_errors: BTreeMap::new(),
        }
    }

    pub fn from_stage(stage: &str, err: StageError) -> Self {
        Self {
            kind: err.kind,
            message: format!("{stage}: {}", err.message),
            stage: Some(stage.to_string()),
            step_errors: err.step_errors,
        }
    }
}

impl fmt::Display for InstallerError {
    /// One `Stage:/Step:/Error:` block per failed step.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(stage) = &self.stage else {
            return write!(f, "Error: {}: {}", self.kind, self.message);
        };
        if self.step_errors.is_empty() {
            // `message` carries the stage name already; the block names it once.
            let prefix = format!("{stage}: ");
            let message = self
                .message
                .strip_prefix(prefix.as_str())
                .unwrap_or(self.message.as_str());
            return write!(f, "Stage: {stage}\nError: {}: {message}", self.kind);
        }
        let mut first = true;
        for (step, err) in &self.step_errors {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "Stage: {stage}\nStep: {step}\nError: {err}")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, StepError>;

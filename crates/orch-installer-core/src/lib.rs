//! Staged step execution engine
//!
//! The installer runs an ordered list of stages, each an ordered list of
//! steps, threading one [`RuntimeState`](orch_installer_config::RuntimeState)
//! through all of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    Installer                     │
//! │   validate action, reverse on uninstall,         │
//! │   filter by labels, cancellation latch           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ pre_stage → run_stage → post_stage
//! ┌─────────────────▼───────────────────────────────┐
//! │                    StepStage                     │
//! │   config → pre → run → post (always) per step    │
//! │   merge + persist after every phase              │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼────────┐
//! │     Step      │ │ StatePersister │
//! │   plug-ins    │ │  file / S3     │
//! └───────────────┘ └────────────────┘
//! ```

pub mod error;
pub mod installer;
pub mod label;
pub mod logging;
pub mod persister;
pub mod stage;
pub mod step;

// Re-exports
pub use error::{ErrorKind, InstallerError, Result, StageError, StepError};
pub use installer::{Canceller, Installer};
pub use label::{Labeled, filter_by_labels, matches_labels};
pub use logging::step_log_file;
pub use persister::{FileStatePersister, RUNTIME_STATE_KEY, StatePersister};
pub use stage::{Stage, StepStage};
pub use step::{Step, require_config, require_state};
pub use tokio_util::sync::CancellationToken;

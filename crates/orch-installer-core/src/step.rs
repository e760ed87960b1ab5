//! Step contract
//!
//! A step is a plug-in with four phases. The [`crate::StepStage`] drives
//! them in order and merges what each phase returns into the shared runtime
//! state:
//!
//! ```text
//! config_step ──ok──► pre_step ──ok──► run_step
//!      │                 │                │
//!      └──── err ────────┴──── err ───────┤
//!                                         ▼
//!                                    post_step (always)
//! ```
//!
//! Returning `RuntimeState::default()` from a phase means "no update".

use crate::error::StepError;
use crate::label::Labeled;
use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Step: Send {
    /// Stable identifier, used as the key in stage errors
    fn name(&self) -> &str;

    fn labels(&self) -> &[String];

    /// Derive internal variables from the config and runtime state.
    /// Must not have side effects.
    async fn config_step(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError>;

    /// Setup before the main action, e.g. upgrade migrations.
    async fn pre_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        Ok(RuntimeState::default())
    }

    async fn run_step(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError>;

    /// Always invoked once the step has been entered. `prev_err` is the error
    /// from the earlier phases; return it unchanged to propagate, or `Ok` to
    /// swallow it.
    async fn post_step(
        &mut self,
        _ctx: &CancellationToken,
        _config: &Config,
        _rs: &RuntimeState,
        prev_err: Option<StepError>,
    ) -> Result<RuntimeState, StepError> {
        match prev_err {
            Some(err) => Err(err),
            None => Ok(RuntimeState::default()),
        }
    }
}

impl Labeled for dyn Step {
    fn labels(&self) -> &[String] {
        Step::labels(self)
    }
}

/// Fail with `InvalidRuntimeState` when a field an earlier step should have
/// produced is still empty.
pub fn require_state(value: &str, field: &str) -> Result<(), StepError> {
    if value.is_empty() {
        return Err(StepError::invalid_runtime_state(format!(
            "{field} is not set in runtime state"
        )));
    }
    Ok(())
}

/// Fail with `InvalidArgument` when a required config field is empty.
pub fn require_config(value: &str, field: &str) -> Result<(), StepError> {
    if value.is_empty() {
        return Err(StepError::invalid_argument(format!("{field} is required")));
    }
    Ok(())
}

//! Top-level driver running stages in order

use crate::error::InstallerError;
use crate::label::filter_by_labels;
use crate::stage::Stage;
use orch_installer_config::{Action, Config, RuntimeState};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Handle to the installer's cancellation latch.
///
/// Setting the latch stops new stages from starting; the stage in flight
/// runs to completion.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    cancelled: Arc<Mutex<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Installer {
    stages: Vec<Box<dyn Stage>>,
    canceller: Canceller,
}

impl Installer {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            canceller: Canceller::default(),
        }
    }

    /// Installer sharing an existing latch, e.g. one a signal handler holds.
    pub fn with_canceller(stages: Vec<Box<dyn Stage>>, canceller: Canceller) -> Self {
        Self { stages, canceller }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }

    /// Latch handle that can be moved into a signal handler.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Run every selected stage for `rs.action`.
    ///
    /// Uninstall visits the stages in reverse order. The first failing stage
    /// stops the run.
    pub async fn run(
        &mut self,
        ctx: &CancellationToken,
        config: &Config,
        rs: &mut RuntimeState,
    ) -> Result<(), InstallerError> {
        if rs.action.is_empty() {
            return Err(InstallerError::invalid_argument("action must be specified"));
        }
        let action: Action = rs.action.parse().map_err(InstallerError::invalid_argument)?;

        let mut stages: Vec<&mut Box<dyn Stage>> = self.stages.iter_mut().collect();
        if action == Action::Uninstall {
            stages.reverse();
        }
        let stages = filter_by_labels(stages, &config.advanced.target_labels);
        if stages.is_empty() {
            tracing::info!("No stages selected for {action}");
            return Ok(());
        }

        for stage in stages {
            if self.canceller.is_cancelled() || ctx.is_cancelled() {
                tracing::info!("Installation cancelled");
                break;
            }
            let name = stage.name().to_string();
            tracing::info!("Running stage: {name}");

            let mut result = stage.pre_stage(ctx, config, rs).await;
            if result.is_ok() {
                result = stage.run_stage(ctx, config, rs).await;
            }
            stage
                .post_stage(ctx, config, rs, result.err())
                .await
                .map_err(|err| InstallerError::from_stage(&name, err))?;
        }
        Ok(())
    }
}

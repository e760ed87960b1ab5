//! Upgrade migration of module state from the legacy state bucket

use crate::helper::{CloudHelper, S3Location};
use orch_installer_config::Config;
use orch_installer_core::{CancellationToken, StepError};
use orch_installer_terraform::{BackendConfig, ModuleRunner, MoveStatesInput, RemoveStatesInput};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a module's state lived before and how its resources were renamed.
#[derive(Debug, Clone, Default)]
pub struct LegacyStateMigration {
    /// Middle segment of the legacy key `{region}/{legacy_path}/{orchName}`
    pub legacy_path: String,
    pub module_path: PathBuf,
    /// Old resource address to new resource address
    pub moves: BTreeMap<String, String>,
    /// Resources the new module no longer manages
    pub removals: Vec<String>,
}

impl LegacyStateMigration {
    pub fn legacy_key(&self, config: &Config) -> String {
        format!(
            "{}/{}/{}",
            config.aws.region, self.legacy_path, config.global.orch_name
        )
    }
}

/// Copy the legacy state object into the module's backend, then re-parent
/// and drop resources.
///
/// A no-op when `aws.previousS3StateBucket` is not set.
pub async fn migrate_legacy_state(
    ctx: &CancellationToken,
    config: &Config,
    helper: &dyn CloudHelper,
    runner: &dyn ModuleRunner,
    backend: &BackendConfig,
    migration: &LegacyStateMigration,
) -> Result<(), StepError> {
    let previous_bucket = &config.aws.previous_s3_state_bucket;
    if previous_bucket.is_empty() {
        tracing::debug!("No previous state bucket, skipping state migration");
        return Ok(());
    }

    let src = S3Location::new(&config.aws.region, previous_bucket, migration.legacy_key(config));
    let dst = S3Location::new(&backend.region, &backend.bucket, &backend.key);
    helper.s3_copy_to_s3(&src, &dst).await.map_err(|e| {
        StepError::internal(format!(
            "failed to move Terraform state from old bucket to new bucket: {e}"
        ))
    })?;

    if !migration.moves.is_empty() {
        let input = MoveStatesInput {
            module_path: migration.module_path.clone(),
            states: migration.moves.clone(),
        };
        runner.move_states(ctx, &input).await.map_err(|e| {
            let err = StepError::from(e);
            StepError::new(err.kind, format!("failed to move Terraform states: {}", err.message))
        })?;
    }

    if !migration.removals.is_empty() {
        let input = RemoveStatesInput {
            module_path: migration.module_path.clone(),
            states: migration.removals.clone(),
        };
        runner.remove_states(ctx, &input).await.map_err(|e| {
            let err = StepError::from(e);
            StepError::new(err.kind, format!("failed to remove Terraform states: {}", err.message))
        })?;
    }

    tracing::info!(
        "Migrated {} state from s3://{}/{}",
        migration.legacy_path,
        src.bucket,
        src.key
    );
    Ok(())
}

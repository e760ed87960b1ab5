//! Bucket holding the remote state of every other module

use super::{module_log_file, require_aws_settings};
use crate::helper::CloudHelper;
use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState, state_bucket_name};
use orch_installer_core::{CancellationToken, Step, StepError};
use orch_installer_terraform::{ModuleRunner, RunInput};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub const STATE_BUCKET_MODULE_PATH: &str = "new-installer/targets/aws/iac/state_bucket";

#[derive(Debug, Clone, Default, Serialize)]
struct StateBucketVariables {
    region: String,
    orch_name: String,
    bucket: String,
}

/// Creates the `{orchName}-{deploymentId}` bucket.
///
/// The bucket cannot hold its own state, so the module runs stateless and
/// the state blob is kept in `rs.stateBucketState`.
pub struct StateBucketStep {
    labels: Vec<String>,
    root_path: PathBuf,
    keep_generated_files: bool,
    runner: Arc<dyn ModuleRunner>,
    helper: Arc<dyn CloudHelper>,
    variables: StateBucketVariables,
}

impl StateBucketStep {
    pub fn new(
        root_path: impl Into<PathBuf>,
        keep_generated_files: bool,
        runner: Arc<dyn ModuleRunner>,
        helper: Arc<dyn CloudHelper>,
    ) -> Self {
        Self {
            labels: vec!["aws".to_string(), "state_bucket".to_string()],
            root_path: root_path.into(),
            keep_generated_files,
            runner,
            helper,
            variables: StateBucketVariables::default(),
        }
    }

    /// Terraform refuses to delete a bucket that still has objects. Runs
    /// right before the destroy: every stage commit uploads the runtime
    /// state into this bucket.
    async fn empty_bucket(&self, dry_run: bool) -> Result<(), StepError> {
        if dry_run {
            tracing::info!("Dry run: not emptying bucket {}", self.variables.bucket);
            return Ok(());
        }
        self.helper
            .empty_s3_bucket(&self.variables.region, &self.variables.bucket)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Step for StateBucketStep {
    fn name(&self) -> &str {
        "AWSStateBucketStep"
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    async fn config_step(
        &mut self,
        _ctx: &CancellationToken,
        config: &Config,
        rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        require_aws_settings(config, rs)?;
        self.variables = StateBucketVariables {
            region: config.aws.region.clone(),
            orch_name: config.global.orch_name.clone(),
            bucket: state_bucket_name(&config.global.orch_name, &rs.deployment_id),
        };
        Ok(RuntimeState::default())
    }

    async fn run_step(
        &mut self,
        ctx: &CancellationToken,
        _config: &Config,
        rs: &RuntimeState,
    ) -> Result<RuntimeState, StepError> {
        let action = rs.parsed_action().ok_or_else(|| {
            StepError::invalid_runtime_state(format!("unsupported action: {}", rs.action))
        })?;

        let mut input = RunInput::new(
            action,
            self.root_path.join(STATE_BUCKET_MODULE_PATH),
            module_log_file(&self.root_path, rs, "aws_state_bucket"),
        );
        input.variables = serde_json::to_value(&self.variables)
            .map_err(|e| StepError::internal(format!("failed to encode variables: {e}")))?;
        input.state = Some(rs.state_bucket_state.clone());
        input.keep_generated_files = self.keep_generated_files;
        input.dry_run = rs.dry_run;

        if rs.is_uninstall() {
            self.empty_bucket(rs.dry_run).await?;
        }
        let output = self.runner.run(ctx, &input).await?;
        if !rs.is_uninstall() && !rs.dry_run && output.state.is_empty() {
            return Err(StepError::internal("Terraform state is empty"));
        }

        let mut update = RuntimeState::default();
        update.state_bucket_state = output.state;
        Ok(update)
    }
}

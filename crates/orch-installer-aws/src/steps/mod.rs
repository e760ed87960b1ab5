//! AWS reference steps

mod migration;
mod state_bucket;
mod vpc;

pub use migration::{LegacyStateMigration, migrate_legacy_state};
pub use state_bucket::{STATE_BUCKET_MODULE_PATH, StateBucketStep};
pub use vpc::{
    DEFAULT_VPC_CIDR, SubnetPlan, SubnetVariable, VPC_BACKEND_KEY, VPC_MODULE_PATH, VpcStep,
    generate_ssh_key_pair, plan_subnets,
};

use orch_installer_config::{Config, RuntimeState};
use orch_installer_core::{StepError, step_log_file};
use std::path::{Path, PathBuf};

/// Settings every AWS step reads in its config phase.
fn require_aws_settings(config: &Config, rs: &RuntimeState) -> Result<(), StepError> {
    if config.global.orch_name.is_empty() {
        return Err(StepError::invalid_argument("OrchName is not set"));
    }
    if config.aws.region.is_empty() {
        return Err(StepError::invalid_argument("Region is not set"));
    }
    if rs.deployment_id.is_empty() {
        return Err(StepError::invalid_runtime_state("DeploymentId is not set"));
    }
    Ok(())
}

/// `{logDir}/{name}.log`, falling back to `{root}/.logs` when the runtime
/// state carries no log directory.
fn module_log_file(root_path: &Path, rs: &RuntimeState, name: &str) -> PathBuf {
    if rs.log_dir.is_empty() {
        step_log_file(root_path.join(".logs"), name)
    } else {
        step_log_file(&rs.log_dir, name)
    }
}

//! AWS stage list

use crate::helper::CloudHelper;
use crate::steps::{StateBucketStep, VpcStep};
use orch_installer_core::{Stage, StatePersister, Step, StepStage};
use orch_installer_terraform::ModuleRunner;
use std::path::PathBuf;
use std::sync::Arc;

/// Inputs shared by every AWS step
#[derive(Clone)]
pub struct AwsStageOptions {
    /// Checkout root the module paths are relative to
    pub root_path: PathBuf,
    pub keep_generated_files: bool,
    pub runner: Arc<dyn ModuleRunner>,
    pub helper: Arc<dyn CloudHelper>,
    pub persister: Arc<dyn StatePersister>,
}

/// `PreInfra` (state bucket) followed by `Infra` (network).
pub fn aws_stages(options: AwsStageOptions) -> Vec<Box<dyn Stage>> {
    let AwsStageOptions {
        root_path,
        keep_generated_files,
        runner,
        helper,
        persister,
    } = options;

    let state_bucket: Box<dyn Step> = Box::new(StateBucketStep::new(
        root_path.clone(),
        keep_generated_files,
        runner.clone(),
        helper.clone(),
    ));
    let vpc: Box<dyn Step> =
        Box::new(VpcStep::new(root_path, keep_generated_files, runner, helper));

    let pre_infra = StepStage::new("PreInfra", vec![state_bucket], persister.clone())
        .with_labels(["pre-infra"]);

    let infra = StepStage::new("Infra", vec![vpc], persister).with_labels(["infra"]);

    vec![Box::new(pre_infra) as Box<dyn Stage>, Box::new(infra)]
}

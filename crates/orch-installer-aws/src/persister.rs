//! Runtime state persistence in the deployment's state bucket

use crate::helper::{AwsCloudHelper, S3Location};
use async_trait::async_trait;
use orch_installer_config::{Config, RuntimeState, state_bucket_name};
use orch_installer_core::{RUNTIME_STATE_KEY, StatePersister, StepError};

/// Uploads `runtime-state.yaml` to `s3://{orchName}-{deploymentId}/`.
///
/// The bucket is created by the state bucket step. Until that step has
/// produced a state blob there is nowhere to write to, and the upload is
/// skipped. A bucket that is already gone during uninstall is skipped too.
#[derive(Debug, Clone, Default)]
pub struct S3StatePersister {
    helper: AwsCloudHelper,
}

impl S3StatePersister {
    pub fn new(helper: AwsCloudHelper) -> Self {
        Self { helper }
    }
}

/// Object address of the runtime state for this deployment.
pub fn runtime_state_location(
    config: &Config,
    rs: &RuntimeState,
) -> Result<S3Location, StepError> {
    if config.global.orch_name.is_empty() {
        return Err(StepError::persistence("global.orchName is not set"));
    }
    if config.aws.region.is_empty() {
        return Err(StepError::persistence("aws.region is not set"));
    }
    if rs.deployment_id.is_empty() {
        return Err(StepError::persistence("deploymentID is not set"));
    }
    Ok(S3Location::new(
        &config.aws.region,
        state_bucket_name(&config.global.orch_name, &rs.deployment_id),
        RUNTIME_STATE_KEY,
    ))
}

#[async_trait]
impl StatePersister for S3StatePersister {
    async fn persist(&self, config: &Config, rs: &RuntimeState) -> Result<(), StepError> {
        if rs.state_bucket_state.is_empty() {
            tracing::debug!("State bucket not created yet, skipping runtime state upload");
            return Ok(());
        }

        let location = runtime_state_location(config, rs)?;
        let body = rs.to_yaml().map_err(|e| {
            StepError::persistence(format!("failed to serialize runtime state: {e}"))
        })?;

        match self.helper.put_object(&location, body.into_bytes()).await {
            Ok(()) => {
                tracing::debug!(
                    "Saved runtime state to s3://{}/{}",
                    location.bucket,
                    location.key
                );
                Ok(())
            }
            Err(crate::AwsError::NoSuchBucket(bucket)) if rs.is_uninstall() => {
                tracing::warn!("State bucket {bucket} is gone, runtime state not uploaded");
                Ok(())
            }
            Err(e) => Err(StepError::persistence(format!(
                "failed to upload runtime state to s3://{}/{}: {e}",
                location.bucket, location.key
            ))),
        }
    }
}

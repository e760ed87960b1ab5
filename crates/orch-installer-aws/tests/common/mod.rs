use async_trait::async_trait;
use orch_installer_aws::{AwsError, CloudHelper, S3Location, VpcSubnets};
use orch_installer_config::{Config, RuntimeState};
use orch_installer_core::{StatePersister, StepError};
use orch_installer_terraform::{
    ModuleRunner, MoveStatesInput, OutputValue, RemoveStatesInput, RunInput, RunOutput,
    TerraformError,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const ZONES: [&str; 3] = ["us-west-2a", "us-west-2b", "us-west-2c"];

pub fn config() -> Config {
    let mut config = Config::default();
    config.provider = "aws".to_string();
    config.global.orch_name = "demo".to_string();
    config.aws.region = "us-west-2".to_string();
    config.aws.customer_tag = "acme".to_string();
    config.aws.jump_host_whitelist = vec!["192.0.2.0/24".to_string()];
    config
}

pub fn runtime_state(action: orch_installer_config::Action) -> RuntimeState {
    let mut rs = RuntimeState::new(action);
    rs.deployment_id = "ab12cd34".to_string();
    rs.log_dir = "/tmp/orch-logs".to_string();
    rs
}

/// What the fake terraform returns for the VPC module.
pub fn vpc_output() -> RunOutput {
    let mut output = RunOutput::default();
    let mut insert = |name: &str, value: serde_json::Value| {
        output.outputs.insert(
            name.to_string(),
            OutputValue {
                sensitive: false,
                value_type: json!("object"),
                value,
            },
        );
    };
    insert("vpc_id", json!("vpc-0abc"));
    insert(
        "private_subnets",
        json!({
            "subnet-us-west-2a": {"id": "subnet-p1"},
            "subnet-us-west-2b": {"id": "subnet-p2"},
            "subnet-us-west-2c": {"id": "subnet-p3"},
        }),
    );
    insert(
        "public_subnets",
        json!({
            "subnet-us-west-2a-pub": {"id": "subnet-u1"},
            "subnet-us-west-2b-pub": {"id": "subnet-u2"},
            "subnet-us-west-2c-pub": {"id": "subnet-u3"},
        }),
    );
    output
}

/// Module runner that records its inputs and answers by module directory.
#[derive(Clone, Default)]
pub struct MockRunner {
    pub runs: Arc<Mutex<Vec<RunInput>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub bucket_state: Arc<Mutex<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        let runner = Self::default();
        *runner.bucket_state.lock().unwrap() = r#"{"version":4}"#.to_string();
        runner
    }

    pub fn with_bucket_state(state: &str) -> Self {
        let runner = Self::default();
        *runner.bucket_state.lock().unwrap() = state.to_string();
        runner
    }

    pub fn runs(&self) -> Vec<RunInput> {
        self.runs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleRunner for MockRunner {
    async fn run(
        &self,
        _ctx: &CancellationToken,
        input: &RunInput,
    ) -> Result<RunOutput, TerraformError> {
        orch_installer_terraform::validate_input(input)?;
        let module = input
            .module_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push(format!("run:{module}:{}", input.action));
        self.runs.lock().unwrap().push(input.clone());

        match module.as_str() {
            "state_bucket" => Ok(RunOutput {
                outputs: Default::default(),
                state: self.bucket_state.lock().unwrap().clone(),
            }),
            "vpc" => Ok(vpc_output()),
            _ => Ok(RunOutput::default()),
        }
    }

    async fn move_states(
        &self,
        _ctx: &CancellationToken,
        input: &MoveStatesInput,
    ) -> Result<(), TerraformError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("move:{}", input.states.len()));
        Ok(())
    }

    async fn remove_states(
        &self,
        _ctx: &CancellationToken,
        input: &RemoveStatesInput,
    ) -> Result<(), TerraformError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove:{}", input.states.len()));
        Ok(())
    }
}

/// Cloud helper answering from fixed data and recording calls.
#[derive(Clone, Default)]
pub struct MockHelper {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub copies: Arc<Mutex<Vec<(S3Location, S3Location)>>>,
    pub fail_copy: bool,
}

impl MockHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn copies(&self) -> Vec<(S3Location, S3Location)> {
        self.copies.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudHelper for MockHelper {
    async fn get_available_zones(&self, region: &str) -> Result<Vec<String>, AwsError> {
        self.record(format!("zones:{region}"));
        Ok(ZONES.iter().map(|z| z.to_string()).collect())
    }

    async fn s3_copy_to_s3(&self, src: &S3Location, dst: &S3Location) -> Result<(), AwsError> {
        self.record("copy".to_string());
        if self.fail_copy {
            return Err(AwsError::NoSuchBucket(src.bucket.clone()));
        }
        self.copies.lock().unwrap().push((src.clone(), dst.clone()));
        Ok(())
    }

    async fn get_subnet_ids_from_vpc(
        &self,
        region: &str,
        vpc_id: &str,
    ) -> Result<VpcSubnets, AwsError> {
        self.record(format!("subnets:{region}:{vpc_id}"));
        Ok(VpcSubnets {
            public: vec!["subnet-pub-1".to_string()],
            private: vec!["subnet-priv-1".to_string(), "subnet-priv-2".to_string()],
        })
    }

    async fn disable_lb_deletion_protection(
        &self,
        _region: &str,
        lb_arn: &str,
    ) -> Result<(), AwsError> {
        self.record(format!("lb:{lb_arn}"));
        Ok(())
    }

    async fn disable_rds_deletion_protection(
        &self,
        _region: &str,
        db_identifier: &str,
    ) -> Result<(), AwsError> {
        self.record(format!("rds:{db_identifier}"));
        Ok(())
    }

    async fn empty_s3_bucket(&self, region: &str, bucket: &str) -> Result<(), AwsError> {
        self.record(format!("empty:{region}:{bucket}"));
        Ok(())
    }
}

/// Persister that appends `persist` to the helper's call log, so uploads
/// and bucket operations can be ordered against each other.
#[derive(Clone)]
pub struct LoggingPersister {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl LoggingPersister {
    pub fn sharing(helper: &MockHelper) -> Self {
        Self {
            calls: Arc::clone(&helper.calls),
        }
    }
}

#[async_trait]
impl StatePersister for LoggingPersister {
    async fn persist(&self, _config: &Config, _rs: &RuntimeState) -> Result<(), StepError> {
        self.calls.lock().unwrap().push("persist".to_string());
        Ok(())
    }
}

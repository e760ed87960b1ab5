//! AWS support for the orchestrator installer
//!
//! - [`CloudHelper`]: the narrow set of AWS calls steps make directly
//! - [`S3StatePersister`]: runtime state in the deployment's state bucket
//! - [`steps`]: state bucket and VPC steps, plus the upgrade state migration
//! - [`aws_stages`]: the stage list the installer runs on AWS
//!
//! # Requirements
//!
//! - AWS credentials in the environment or the shared config files
//! - `terraform` for the module runner the steps are given

pub mod error;
pub mod helper;
pub mod persister;
pub mod stages;
pub mod steps;

pub use error::{AwsError, Result};
pub use helper::{AwsCloudHelper, CloudHelper, S3Location, VpcSubnets};
pub use persister::{S3StatePersister, runtime_state_location};
pub use stages::{AwsStageOptions, aws_stages};

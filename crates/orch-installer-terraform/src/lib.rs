//! Terraform module runner for the orchestrator installer
//!
//! # Requirements
//!
//! - `terraform` CLI must be installed; its path is passed to [`Terraform::new`]
//! - Cloud credentials are picked up by terraform from the environment
//!
//! # Example
//!
//! ```ignore
//! use orch_installer_terraform::{ModuleRunner, RunInput, Terraform};
//!
//! let terraform = Terraform::new("/usr/local/bin/terraform")?;
//! let mut input = RunInput::new(Action::Install, "terraform/vpc", "logs/aws_vpc.log");
//! input.variables = serde_json::json!({ "region": "us-west-2" });
//! input.state = Some(String::new());
//!
//! let output = terraform.run(&ctx, &input).await?;
//! ```

pub mod error;
pub mod runner;
pub mod terraform;

pub use error::{Result, TerraformError};
pub use runner::{
    BackendConfig, ModuleRunner, MoveStatesInput, OutputValue, RemoveStatesInput, RunInput,
    RunOutput, validate_input,
};
pub use terraform::Terraform;

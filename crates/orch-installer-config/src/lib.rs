//! Configuration and runtime state for the orchestrator installer
//!
//! - [`Config`]: what the user wants deployed, immutable during a run
//! - [`RuntimeState`]: what the steps have produced so far, merged with
//!   [`merge_runtime_state`] after every step phase

pub mod config;
pub mod error;
pub mod merge;
pub mod naming;
pub mod runtime_state;
pub mod store;

pub use config::{
    AdvancedConfig, AwsConfig, CertConfig, Config, GlobalConfig, MIN_USER_CONFIG_VERSION,
    OnpremConfig, OrchConfig, ProxyConfig, Scale, SmtpConfig, SreConfig, USER_CONFIG_VERSION,
};
pub use error::{ConfigError, Result};
pub use merge::{merge_runtime_state, merge_value};
pub use naming::{ensure_deployment_id, generate_deployment_id, resource_name, state_bucket_name};
pub use runtime_state::{
    Action, AwsState, CertState, DatabaseState, JumpHostState, LoadBalancerState, OnpremState,
    RUNTIME_STATE_VERSION, RuntimeState,
};
pub use store::{ConfigStore, FileConfigStore};

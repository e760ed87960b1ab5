//! Runtime state threaded through every installer step
//!
//! Steps never share memory; everything one step produces for another goes
//! through this record. It is merged after every step phase and persisted
//! so an interrupted run can resume.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bump on every backward-compatible runtime state schema change.
pub const RUNTIME_STATE_VERSION: u32 = 2;

/// Top-level installer action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Install,
    Upgrade,
    Uninstall,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Upgrade => "upgrade",
            Action::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "install" => Ok(Action::Install),
            "upgrade" => Ok(Action::Upgrade),
            "uninstall" => Ok(Action::Uninstall),
            other => Err(format!("unsupported action: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeState {
    pub version: u32,
    /// One of "install", "upgrade" or "uninstall". Kept as a string so an
    /// unknown value read from disk can be reported instead of failing to load.
    pub action: String,
    pub log_dir: String,
    pub dry_run: bool,
    /// Lowercase alphanumeric postfix for globally unique resource names.
    /// Set once per deployment.
    #[serde(rename = "deploymentID")]
    pub deployment_id: String,
    /// Terraform state of the state bucket module, which cannot live in the
    /// bucket it creates.
    pub state_bucket_state: String,
    pub kube_config: String,
    pub cert: CertState,
    pub aws: AwsState,
    pub database: DatabaseState,
    pub onprem: OnpremState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertState {
    pub tls_cert: String,
    pub tls_key: String,
    #[serde(rename = "tlsCA")]
    pub tls_ca: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsState {
    #[serde(rename = "vpcID")]
    pub vpc_id: String,
    #[serde(rename = "publicSubnetIDs")]
    pub public_subnet_ids: Vec<String>,
    #[serde(rename = "privateSubnetIDs")]
    pub private_subnet_ids: Vec<String>,
    pub cache_registry: String,
    pub jump_host: JumpHostState,
    #[serde(rename = "efsFileSystemID")]
    pub efs_file_system_id: String,
    #[serde(rename = "eksOIDCIssuer")]
    pub eks_oidc_issuer: String,
    pub acm_cert_arn: String,
    /// Load balancers keyed by service, e.g. "traefik" or "argocd"
    pub load_balancers: BTreeMap<String, LoadBalancerState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JumpHostState {
    pub ip: String,
    pub ssh_public_key: String,
    pub ssh_private_key: String,
    /// Local port of the active SSH tunnel
    pub tunnel_port: u16,
    pub tunnel_pid: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerState {
    pub arn: String,
    pub dns_name: String,
    /// Target group ARNs keyed by listener name
    pub target_groups: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseState {
    pub host: String,
    pub reader_host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnpremState {
    pub kube_config: String,
}

impl RuntimeState {
    /// Fresh state for a new deployment.
    pub fn new(action: Action) -> Self {
        Self {
            version: RUNTIME_STATE_VERSION,
            action: action.to_string(),
            ..Default::default()
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parsed action, if it is one the installer understands.
    pub fn parsed_action(&self) -> Option<Action> {
        self.action.parse().ok()
    }

    pub fn is_uninstall(&self) -> bool {
        self.parsed_action() == Some(Action::Uninstall)
    }

    pub fn is_upgrade(&self) -> bool {
        self.parsed_action() == Some(Action::Upgrade)
    }

    /// Whether this is the zero value, which merges as "no update".
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

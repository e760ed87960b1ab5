//! User-facing installer configuration
//!
//! The config describes what the user wants deployed. It is produced once by
//! the config loader and never mutated by the engine.

use crate::error::{ConfigError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Bump on every backward-compatible config schema change.
pub const USER_CONFIG_VERSION: u32 = 4;

/// Oldest config version this installer still reads.
pub const MIN_USER_CONFIG_VERSION: u32 = 1;

const MAX_ORCH_NAME_LEN: usize = 16;

static ORCH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").unwrap());
static PARENT_DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-.]+\.[a-z0-9-]+$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap());
static AWS_REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d$").unwrap());
static VPC_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^vpc-[0-9a-f]{8,17}$").unwrap());

/// Deployment size tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Scale {
    #[default]
    Scale50,
    Scale100,
    Scale500,
    Scale1000,
}

impl Scale {
    pub const ALL: [Scale; 4] = [
        Scale::Scale50,
        Scale::Scale100,
        Scale::Scale500,
        Scale::Scale1000,
    ];

    /// Number of edge nodes the tier is sized for.
    pub fn nodes(self) -> u32 {
        match self {
            Scale::Scale50 => 50,
            Scale::Scale100 => 100,
            Scale::Scale500 => 500,
            Scale::Scale1000 => 1000,
        }
    }
}

impl TryFrom<u32> for Scale {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Scale::ALL
            .into_iter()
            .find(|s| s.nodes() == value)
            .ok_or_else(|| format!("unsupported scale {value}, expected one of 50, 100, 500, 1000"))
    }
}

impl From<Scale> for u32 {
    fn from(scale: Scale) -> Self {
        scale.nodes()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nodes())
    }
}

/// Installer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub version: u32,
    /// Target provider, e.g. "aws" or "onprem"
    pub provider: String,
    pub global: GlobalConfig,
    pub advanced: AdvancedConfig,
    pub aws: AwsConfig,
    pub onprem: OnpremConfig,
    pub orch: OrchConfig,
    pub cert: CertConfig,
    pub sre: SreConfig,
    pub smtp: SmtpConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalConfig {
    /// Deployment name, used as the prefix of every external resource
    pub orch_name: String,
    /// Parent DNS domain, not including the cluster name
    pub parent_domain: String,
    pub admin_email: String,
    pub scale: Scale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedConfig {
    /// Only stages and steps carrying one of these labels run. Empty runs everything.
    pub target_labels: Vec<String>,
    pub dev_mode: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub azure_ad_refresh_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub azure_ad_token_endpoint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsConfig {
    pub region: String,
    pub customer_tag: String,
    pub cache_registry: String,
    /// Pre-existing VPC to install into instead of creating one
    #[serde(rename = "vpcID")]
    pub vpc_id: String,
    pub jump_host_whitelist: Vec<String>,
    pub load_balancer_allow_list: Vec<String>,
    #[serde(rename = "eksIAMRoles")]
    pub eks_iam_roles: Vec<String>,
    /// State bucket of a previous installation. Non-empty means upgrade migration.
    pub previous_s3_state_bucket: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnpremConfig {
    #[serde(rename = "localIP")]
    pub local_ip: String,
    #[serde(rename = "argoIP")]
    pub argo_ip: String,
    #[serde(rename = "traefikIP")]
    pub traefik_ip: String,
    #[serde(rename = "nginxIP")]
    pub nginx_ip: String,
    pub docker_username: String,
    pub docker_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchConfig {
    /// Enabled orchestrator packages
    pub enabled: Vec<String>,
    pub default_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertConfig {
    pub tls_cert: String,
    pub tls_key: String,
    #[serde(rename = "tlsCA")]
    pub tls_ca: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SreConfig {
    pub username: String,
    pub password: String,
    #[serde(rename = "secretURL")]
    pub secret_url: String,
    pub ca_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmtpConfig {
    pub username: String,
    pub password: String,
    pub url: String,
    pub port: String,
    pub from: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    pub http_proxy: String,
    pub https_proxy: String,
    pub socks_proxy: String,
    pub no_proxy: String,
    pub en_http_proxy: String,
    pub en_https_proxy: String,
    pub en_ftp_proxy: String,
    pub en_socks_proxy: String,
    pub en_no_proxy: String,
}

impl Config {
    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn is_aws(&self) -> bool {
        self.provider == "aws"
    }

    /// Check the fields a user fills in by hand.
    pub fn validate(&self) -> Result<()> {
        if self.version > USER_CONFIG_VERSION {
            return Err(ConfigError::invalid(
                "version",
                format!(
                    "config version {} is newer than supported version {}",
                    self.version, USER_CONFIG_VERSION
                ),
            ));
        }
        if self.version < MIN_USER_CONFIG_VERSION {
            return Err(ConfigError::invalid(
                "version",
                format!("config version {} is no longer supported", self.version),
            ));
        }

        let name = &self.global.orch_name;
        if name.is_empty() {
            return Err(ConfigError::invalid("orchestrator name", "cannot be empty"));
        }
        if name.len() >= MAX_ORCH_NAME_LEN {
            return Err(ConfigError::invalid(
                "orchestrator name",
                format!("must be less than {MAX_ORCH_NAME_LEN} characters"),
            ));
        }
        if !ORCH_NAME_RE.is_match(name) {
            return Err(ConfigError::invalid(
                "orchestrator name",
                "must be all lower case letters or digits",
            ));
        }
        if !PARENT_DOMAIN_RE.is_match(&self.global.parent_domain) {
            return Err(ConfigError::invalid(
                "parent domain",
                "must be all lower case letters, digits, '-' or '.'",
            ));
        }
        if !EMAIL_RE.is_match(&self.global.admin_email) {
            return Err(ConfigError::invalid(
                "admin email",
                "must be a valid email address",
            ));
        }

        if self.is_aws() {
            if !AWS_REGION_RE.is_match(&self.aws.region) {
                return Err(ConfigError::invalid(
                    "AWS region",
                    "must look like 'us-west-2'",
                ));
            }
            if !self.aws.vpc_id.is_empty() && !VPC_ID_RE.is_match(&self.aws.vpc_id) {
                return Err(ConfigError::invalid(
                    "AWS VPC ID",
                    "must look like 'vpc-12345678'",
                ));
            }
        }
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use duration_string::DurationString;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {0} not found")]
    FileNotFound(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Region and optional static credentials, passed into every AWS client
/// constructor. Without the key pair the SDK default provider chain is
/// used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSettings {
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// One stack in the provisioning pipeline. `outputs` names the output keys
/// to carry forward as parameters for the stacks that follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackEntry {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub app_name: String,
    pub environment: String,
    #[serde(default = "default_cloudformation_path")]
    pub cloudformation_path: String,
    #[serde(default)]
    pub stack_name: Option<String>,
    #[serde(default)]
    pub disable_rollback: bool,
    #[serde(default)]
    pub delete_failed_stacks: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: DurationString,
    #[serde(default)]
    pub poll_timeout: Option<DurationString>,
    #[serde(default)]
    pub stacks: Vec<StackEntry>,
    #[serde(default)]
    pub ssh_key: Option<String>,
    #[serde(default)]
    pub ssh_user: Option<String>,
    pub aws: AwsSettings,
}

fn default_cloudformation_path() -> String {
    "provisioning".to_string()
}

fn default_poll_interval() -> DurationString {
    DurationString::from(Duration::from_secs(5))
}

impl DeployConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Template file for single-stack provisioning:
    /// `{cloudformation_path}/{environment}.json`
    pub fn template_file(&self) -> PathBuf {
        PathBuf::from(&self.cloudformation_path).join(format!("{}.json", self.environment))
    }

    /// Template file for one pipeline stack:
    /// `{cloudformation_path}/{environment}-{template}.json`
    pub fn stack_template_file(&self, entry: &StackEntry) -> PathBuf {
        PathBuf::from(&self.cloudformation_path)
            .join(format!("{}-{}.json", self.environment, entry.template))
    }

    /// Project metadata passed into every stack as tags.
    pub fn default_tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Environment".to_string(), self.environment.clone()),
            ("Project".to_string(), self.app_name.clone()),
        ])
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.clone().into()
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout.clone().map(Into::into)
    }
}

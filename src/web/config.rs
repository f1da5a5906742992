use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::background::TaskOptions;
use crate::connectivity::DEFAULT_CHECK_TIMEOUT;
use crate::location::{DEFAULT_CAPTURE_TIMEOUT, DEFAULT_GPSD_ADDR};
use crate::permission::{PermissionKind, RetryPolicy};
use crate::sink::DEFAULT_TIMEOUT;
use crate::tracker::CaptureInterval;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub tracker: TrackerSettings,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerSettings {
    #[serde(default)]
    pub interval: CaptureInterval,
    #[serde(default)]
    pub autostart: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backlog_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default = "default_remote_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
}

fn default_remote_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    /// `host:port` to probe. Defaults to the remote endpoint.
    pub probe: Option<String>,
    #[serde(default = "default_check_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe: None,
            timeout: default_check_timeout(),
        }
    }
}

fn default_check_timeout() -> Duration {
    DEFAULT_CHECK_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_gpsd")]
    pub gpsd: String,
    #[serde(default = "default_capture_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            gpsd: default_gpsd(),
            timeout: default_capture_timeout(),
        }
    }
}

fn default_gpsd() -> String {
    DEFAULT_GPSD_ADDR.to_string()
}

fn default_capture_timeout() -> Duration {
    DEFAULT_CAPTURE_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub granted: HashSet<PermissionKind>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff", deserialize_with = "duration")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", deserialize_with = "duration")]
    pub max_backoff: Duration,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            granted: HashSet::new(),
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl PermissionsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_initial_backoff() -> Duration {
    RetryPolicy::default().initial_backoff
}

fn default_max_backoff() -> Duration {
    RetryPolicy::default().max_backoff
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub task_name: String,
    pub title: String,
    pub description: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let options = TaskOptions::default();
        Self {
            task_name: options.task_name,
            title: options.title,
            description: options.description,
        }
    }
}

impl From<&NotificationConfig> for TaskOptions {
    fn from(config: &NotificationConfig) -> Self {
        TaskOptions {
            task_name: config.task_name.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<ApiPermission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApiPermission {
    Control,
    Read,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.remote.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("remote.base_url is empty".into()));
        }
        reqwest::Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("remote.base_url: {}", e)))?;
        if self.permissions.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "permissions.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

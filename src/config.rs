//! Configuration of the gateway controller.
//!
//! Values are read from an optional YAML file and overridden by environment variables prefixed
//! with `NR_GW_`. Nested keys are separated by a double underscore since keys use snake_case,
//! eg. `NR_GW_GATEWAY__REPLICAS=2` sets `gateway.replicas`.

use crate::k8s::client::ClientConfig;
use crate::logging::LoggingConfig;
use ::config::{Config, Environment, File, FileFormat};
use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_VAR_PREFIX: &str = "NR_GW";
const DEFAULT_NAMESPACE: &str = "newrelic";
const DEFAULT_GATEWAY_NAME: &str = "newrelic-collector-gateway";
const DEFAULT_GATEWAY_IMAGE: &str = "newrelic/nrdot-collector-k8s:latest";
const DEFAULT_SETTINGS_NAME: &str = "newrelic-collector-settings";
const DEFAULT_RESYNC: Duration = Duration::from_secs(300);
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("loading config: `{0}`")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Namespace holding the gateway objects and the resources it reads.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub gateway: GatewayDeploymentConfig,
    /// Name of the CollectorSettings object sizing the gateway.
    #[serde(default = "default_settings_name")]
    pub settings_name: String,
    #[serde(default)]
    pub requeue: RequeueConfig,
    #[serde(default)]
    pub k8s: ClientConfig,
    #[serde(default)]
    pub log: LoggingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            gateway: GatewayDeploymentConfig::default(),
            settings_name: default_settings_name(),
            requeue: RequeueConfig::default(),
            k8s: ClientConfig::default(),
            log: LoggingConfig::default(),
        }
    }
}

/// Gateway deployment parameters not coming from the cluster.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayDeploymentConfig {
    #[serde(default = "default_gateway_name")]
    pub name: String,
    #[serde(default = "default_gateway_image")]
    pub image: String,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    #[serde(default = "default_replicas")]
    pub replicas: i32,
}

impl Default for GatewayDeploymentConfig {
    fn default() -> Self {
        Self {
            name: default_gateway_name(),
            image: default_gateway_image(),
            image_pull_secrets: Vec::default(),
            replicas: default_replicas(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RequeueConfig {
    /// Delay until the next pass after a successful one.
    #[serde(
        default = "default_resync",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub resync: Duration,
    /// Delay until the next pass after a failed one.
    #[serde(
        default = "default_error_backoff",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub error_backoff: Duration,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            resync: DEFAULT_RESYNC,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_gateway_name() -> String {
    DEFAULT_GATEWAY_NAME.to_string()
}

fn default_gateway_image() -> String {
    DEFAULT_GATEWAY_IMAGE.to_string()
}

fn default_replicas() -> i32 {
    1
}

fn default_settings_name() -> String {
    DEFAULT_SETTINGS_NAME.to_string()
}

fn default_resync() -> Duration {
    DEFAULT_RESYNC
}

fn default_error_backoff() -> Duration {
    DEFAULT_ERROR_BACKOFF
}

/// Writes a duration in a form `duration-str` reads back.
pub(crate) fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_millis() == 0 {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    } else {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }
}

impl GatewayConfig {
    /// Loads the configuration from the given file, if any, and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Same as [GatewayConfig::load] reading the environment variables from `env` when present.
    pub(crate) fn load_with_env(
        path: Option<&Path>,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_VAR_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize::<GatewayConfig>()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace cannot be empty".to_string()));
        }
        if self.gateway.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "gateway name cannot be empty".to_string(),
            ));
        }
        if self.gateway.replicas < 0 {
            return Err(ConfigError::Invalid(format!(
                "gateway replicas must not be negative, got {}",
                self.gateway.replicas
            )));
        }
        Ok(())
    }
}

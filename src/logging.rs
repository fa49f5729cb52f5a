use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;
use tracing::metadata::LevelFilter;
use tracing_subscriber::fmt::format::PrettyFields;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

/// An enum representing possible errors during the logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("init logging error: `{0}`")]
    TryInitError(String),
    #[error("invalid logging directives `{0}`: {1}")]
    InvalidDirectives(String, String),
}

/// Defines the logging configuration for an application.
///
/// # Fields:
/// - `level`: Filtering directives, a plain level (`debug`) or `RUST_LOG` like targets
///   (`info,newrelic_collector_gateway=trace`).
/// - `format`: Specifies the `LoggingFormat` the application will use for logging.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub(crate) level: LogLevel,
    #[serde(default)]
    pub(crate) format: LoggingFormat,
}

/// Represents a custom time stamp format for logging.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub(crate) struct TimestampFormat(pub(crate) String);

/// The default format is based on
/// [chrono strftime](https://docs.rs/chrono/latest/chrono/format/strftime/index.html#fn7)
impl Default for TimestampFormat {
    fn default() -> Self {
        Self("%Y-%m-%dT%H:%M:%S".to_string())
    }
}

/// Defines the format to be used for logging.
///
/// # Fields:
/// - `target`: Whether the target of the trace event is included in the formatted output.
/// - `timestamp`: Specifies a `TimestampFormat` the application will use for logging timestamps.
/// - `ansi_colors`: Whether the output is colored.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct LoggingFormat {
    #[serde(default)]
    pub(crate) target: bool,
    #[serde(default)]
    pub(crate) timestamp: TimestampFormat,
    #[serde(default)]
    pub(crate) ansi_colors: bool,
}

impl LoggingConfig {
    /// Attempts to initialize the logging subscriber with the inner configuration.
    pub fn try_init(&self) -> Result<(), LoggingError> {
        tracing_subscriber::fmt()
            .with_target(self.format.target)
            .with_ansi(self.format.ansi_colors)
            .with_env_filter(self.level.env_filter()?)
            .with_timer(ChronoLocal::new(self.format.timestamp.0.clone()))
            .fmt_fields(PrettyFields::new())
            .try_init()
            .map_err(|_| {
                LoggingError::TryInitError(
                    "unable to set gateway global logging subscriber".to_string(),
                )
            })?;

        debug!("Logging initialized successfully");
        Ok(())
    }
}

/// Filtering directives checked when the configuration is read.
#[derive(Debug, PartialEq, Clone)]
pub(crate) struct LogLevel(String);

impl LogLevel {
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse(&self.0)
            .map_err(|err| LoggingError::InvalidDirectives(self.0.clone(), err.to_string()))
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(DEFAULT_LOG_LEVEL.to_string())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let level = LogLevel(String::deserialize(deserializer)?);
        level.env_filter().map_err(serde::de::Error::custom)?;
        Ok(level)
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

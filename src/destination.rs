use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Telemetry signal a destination can receive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    /// Prefix used when naming collector pipelines for this signal.
    pub fn pipeline_prefix(&self) -> &'static str {
        match self {
            Signal::Traces => "traces",
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
        }
    }

    /// Name of the pipeline carrying this signal to the given vendor destination.
    pub fn pipeline_name(&self, vendor: &str, destination_name: &str) -> String {
        format!("{}/{vendor}-{destination_name}", self.pipeline_prefix())
    }

    /// Returns the signal a pipeline name belongs to, if any.
    pub fn from_pipeline_name(pipeline: &str) -> Option<Signal> {
        let (prefix, _) = pipeline.split_once('/')?;
        [Signal::Traces, Signal::Metrics, Signal::Logs]
            .into_iter()
            .find(|s| s.pipeline_prefix() == prefix)
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pipeline_prefix())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown destination type `{0}`")]
pub struct UnknownDestinationType(pub String);

/// Vendors the gateway knows how to export to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DestinationType {
    NewRelic,
    Quickwit,
    Sentry,
    Splunk,
    GrafanaCloudLoki,
    GrafanaCloudPrometheus,
    Honeycomb,
    Jaeger,
}

const NEWRELIC: &str = "newrelic";
const QUICKWIT: &str = "quickwit";
const SENTRY: &str = "sentry";
const SPLUNK: &str = "splunk";
const GRAFANA_CLOUD_LOKI: &str = "grafanacloudloki";
const GRAFANA_CLOUD_PROMETHEUS: &str = "grafanacloudprometheus";
const HONEYCOMB: &str = "honeycomb";
const JAEGER: &str = "jaeger";

impl DestinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::NewRelic => NEWRELIC,
            DestinationType::Quickwit => QUICKWIT,
            DestinationType::Sentry => SENTRY,
            DestinationType::Splunk => SPLUNK,
            DestinationType::GrafanaCloudLoki => GRAFANA_CLOUD_LOKI,
            DestinationType::GrafanaCloudPrometheus => GRAFANA_CLOUD_PROMETHEUS,
            DestinationType::Honeycomb => HONEYCOMB,
            DestinationType::Jaeger => JAEGER,
        }
    }

    /// Signals the vendor is able to receive, regardless of what a destination enables.
    pub fn supported_signals(&self) -> &'static [Signal] {
        match self {
            DestinationType::NewRelic | DestinationType::Honeycomb => {
                &[Signal::Traces, Signal::Metrics, Signal::Logs]
            }
            DestinationType::Quickwit => &[Signal::Traces, Signal::Logs],
            DestinationType::Sentry | DestinationType::Splunk | DestinationType::Jaeger => {
                &[Signal::Traces]
            }
            DestinationType::GrafanaCloudLoki => &[Signal::Logs],
            DestinationType::GrafanaCloudPrometheus => &[Signal::Metrics],
        }
    }

    pub fn all() -> [DestinationType; 8] {
        [
            DestinationType::NewRelic,
            DestinationType::Quickwit,
            DestinationType::Sentry,
            DestinationType::Splunk,
            DestinationType::GrafanaCloudLoki,
            DestinationType::GrafanaCloudPrometheus,
            DestinationType::Honeycomb,
            DestinationType::Jaeger,
        ]
    }
}

impl FromStr for DestinationType {
    type Err = UnknownDestinationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownDestinationType(s.to_string()))
    }
}

impl Display for DestinationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user declared export target as consumed by the config synthesis.
///
/// The destination type is kept as the raw identifier read from the cluster so an unknown
/// vendor can be reported by the registry instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Destination {
    pub name: String,
    #[serde(rename = "type")]
    pub dest_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
}

impl Destination {
    pub fn new(name: &str, dest_type: DestinationType) -> Self {
        Self {
            name: name.to_string(),
            dest_type: dest_type.to_string(),
            data: BTreeMap::default(),
            signals: BTreeSet::default(),
            secret_ref: None,
        }
    }

    pub fn with_signals<I: IntoIterator<Item = Signal>>(mut self, signals: I) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    pub fn with_data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_secret_ref(mut self, secret: &str) -> Self {
        self.secret_ref = Some(secret.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Returns true when the vendor supports the signal and the destination has it enabled.
pub fn is_signal_enabled(dest: &Destination, signal: Signal) -> bool {
    DestinationType::from_str(&dest.dest_type)
        .is_ok_and(|t| t.supported_signals().contains(&signal))
        && dest.signals.contains(&signal)
}

pub fn is_tracing_enabled(dest: &Destination) -> bool {
    is_signal_enabled(dest, Signal::Traces)
}

pub fn is_metrics_enabled(dest: &Destination) -> bool {
    is_signal_enabled(dest, Signal::Metrics)
}

pub fn is_logging_enabled(dest: &Destination) -> bool {
    is_signal_enabled(dest, Signal::Logs)
}

/// Signals enabled for the destination, in pipeline order.
pub fn enabled_signals(dest: &Destination) -> Vec<Signal> {
    [Signal::Traces, Signal::Metrics, Signal::Logs]
        .into_iter()
        .filter(|s| is_signal_enabled(dest, *s))
        .collect()
}

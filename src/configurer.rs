//! Per vendor contributions to the gateway collector configuration.
//!
//! Each supported [DestinationType] has one [DestinationConfigurer] that adds the exporters,
//! processors, extensions and pipelines required to ship data to a destination of that type.
//! A destination missing required fields or carrying invalid ones contributes nothing, so one
//! misconfigured destination never blocks the rest.

use crate::collector_config::CollectorConfig;
use crate::destination::{Destination, DestinationType};

pub mod grafana_cloud_loki;
pub mod grafana_cloud_prometheus;
pub mod honeycomb;
pub mod jaeger;
pub mod newrelic;
pub mod quickwit;
pub mod registry;
pub mod sentry;
pub mod splunk;
pub mod validators;

pub use registry::{ConfigurerRegistry, RegistryError};

/// Contributes the configuration needed by destinations of a single vendor.
pub trait DestinationConfigurer {
    fn dest_type(&self) -> DestinationType;

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig);
}

/// Name of a component (exporter or processor) owned by a destination.
pub(crate) fn component_name(kind: &str, vendor: &str, destination_name: &str) -> String {
    format!("{kind}/{vendor}-{destination_name}")
}

/// Name of an extension owned by a destination.
pub(crate) fn extension_name(kind: &str, vendor: &str, destination_name: &str) -> String {
    format!("{kind}/{vendor}{destination_name}")
}

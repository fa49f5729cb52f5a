use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{is_tracing_enabled, Destination, DestinationType, Signal};
use serde_json::json;
use tracing::info;

const SENTRY_DSN_PLACEHOLDER: &str = "${DSN}";
const VENDOR: &str = "sentry";

/// Sentry is configured only through its DSN, which comes from the destination secret.
pub struct Sentry;

impl DestinationConfigurer for Sentry {
    fn dest_type(&self) -> DestinationType {
        DestinationType::Sentry
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        if !is_tracing_enabled(dest) {
            info!(destination = %dest.name, "Sentry is not enabled for any supported signals, skipping");
            return;
        }

        let exporter_name = component_name("sentry", VENDOR, &dest.name);
        config.exporters.insert(
            exporter_name.clone(),
            json!({
                "dsn": SENTRY_DSN_PLACEHOLDER,
            }),
        );
        config.service.pipelines.insert(
            Signal::Traces.pipeline_name(VENDOR, &dest.name),
            Pipeline::new(vec![], vec![exporter_name]),
        );
    }
}

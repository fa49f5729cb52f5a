use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{is_tracing_enabled, Destination, DestinationType, Signal};
use serde_json::json;
use tracing::info;

const SPLUNK_REALM_KEY: &str = "SPLUNK_REALM";
const SPLUNK_ACCESS_TOKEN_PLACEHOLDER: &str = "${SPLUNK_ACCESS_TOKEN}";
const VENDOR: &str = "splunk";

/// Sends traces to Splunk Observability through the SAPM exporter of the configured realm.
pub struct Splunk;

impl DestinationConfigurer for Splunk {
    fn dest_type(&self) -> DestinationType {
        DestinationType::Splunk
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        if !is_tracing_enabled(dest) {
            info!(destination = %dest.name, "Tracing not enabled, gateway will not be configured for Splunk");
            return;
        }

        let Some(realm) = dest.get(SPLUNK_REALM_KEY) else {
            info!(
                destination = %dest.name,
                "Splunk realm not specified, gateway will not be configured for Splunk"
            );
            return;
        };

        let exporter_name = component_name("sapm", VENDOR, &dest.name);
        config.exporters.insert(
            exporter_name.clone(),
            json!({
                "access_token": SPLUNK_ACCESS_TOKEN_PLACEHOLDER,
                "endpoint": format!("https://ingest.{realm}.signalfx.com/v2/trace"),
            }),
        );
        config.service.pipelines.insert(
            Signal::Traces.pipeline_name(VENDOR, &dest.name),
            Pipeline::new(vec![], vec![exporter_name]),
        );
    }
}

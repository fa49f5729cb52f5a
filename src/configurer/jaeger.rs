use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{is_tracing_enabled, Destination, DestinationType, Signal};
use serde_json::json;
use tracing::info;

const JAEGER_URL_KEY: &str = "JAEGER_URL";
const VENDOR: &str = "jaeger";

/// Jaeger collectors ingest OTLP natively, usually from inside the cluster without TLS.
pub struct Jaeger;

impl DestinationConfigurer for Jaeger {
    fn dest_type(&self) -> DestinationType {
        DestinationType::Jaeger
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        if !is_tracing_enabled(dest) {
            info!(destination = %dest.name, "Tracing not enabled, gateway will not be configured for Jaeger");
            return;
        }

        let Some(url) = dest.get(JAEGER_URL_KEY) else {
            info!(
                destination = %dest.name,
                "Jaeger url not specified, gateway will not be configured for Jaeger"
            );
            return;
        };

        let exporter_name = component_name("otlp", VENDOR, &dest.name);
        config.exporters.insert(
            exporter_name.clone(),
            json!({
                "endpoint": url,
                "tls": {
                    "insecure": true,
                },
            }),
        );
        config.service.pipelines.insert(
            Signal::Traces.pipeline_name(VENDOR, &dest.name),
            Pipeline::new(vec![], vec![exporter_name]),
        );
    }
}

use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{enabled_signals, Destination, DestinationType};
use serde_json::json;
use tracing::info;

const QUICKWIT_URL_KEY: &str = "QUICKWIT_URL";
const VENDOR: &str = "quickwit";

/// Plain OTLP endpoint without authentication, Quickwit only ingests traces and logs.
pub struct Quickwit;

impl DestinationConfigurer for Quickwit {
    fn dest_type(&self) -> DestinationType {
        DestinationType::Quickwit
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        let signals = enabled_signals(dest);
        if signals.is_empty() {
            info!(destination = %dest.name, "Quickwit destination has no enabled signals, skipping");
            return;
        }

        let Some(url) = dest.get(QUICKWIT_URL_KEY) else {
            info!(
                destination = %dest.name,
                "Quickwit url not specified, gateway will not be configured for Quickwit"
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

        for signal in signals {
            config.service.pipelines.insert(
                signal.pipeline_name(VENDOR, &dest.name),
                Pipeline::new(vec![], vec![exporter_name.clone()]),
            );
        }
    }
}

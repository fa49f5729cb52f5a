use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{enabled_signals, Destination, DestinationType};
use serde_json::json;
use tracing::info;

const HONEYCOMB_ENDPOINT_KEY: &str = "HONEYCOMB_ENDPOINT";
const HONEYCOMB_DEFAULT_ENDPOINT: &str = "api.honeycomb.io:443";
const HONEYCOMB_API_KEY_PLACEHOLDER: &str = "${HONEYCOMB_API_KEY}";
const VENDOR: &str = "honeycomb";

/// OTLP exporter authenticated with the team API key. The endpoint is only needed for
/// non-default Honeycomb regions.
pub struct Honeycomb;

impl DestinationConfigurer for Honeycomb {
    fn dest_type(&self) -> DestinationType {
        DestinationType::Honeycomb
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        let signals = enabled_signals(dest);
        if signals.is_empty() {
            info!(destination = %dest.name, "Honeycomb destination has no enabled signals, skipping");
            return;
        }

        let endpoint = dest
            .get(HONEYCOMB_ENDPOINT_KEY)
            .unwrap_or(HONEYCOMB_DEFAULT_ENDPOINT);

        let exporter_name = component_name("otlp", VENDOR, &dest.name);
        config.exporters.insert(
            exporter_name.clone(),
            json!({
                "endpoint": endpoint,
                "headers": {
                    "x-honeycomb-team": HONEYCOMB_API_KEY_PLACEHOLDER,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurer::tests::{assert_untouched, pipeline};
    use crate::destination::Signal;

    #[test]
    fn default_endpoint() {
        let dest = Destination::new("hc", DestinationType::Honeycomb).with_signals([Signal::Traces]);
        let mut config = CollectorConfig::default();

        Honeycomb.modify_config(&dest, &mut config);

        assert_eq!(
            config.exporters["otlp/honeycomb-hc"],
            json!({
                "endpoint": "api.honeycomb.io:443",
                "headers": {"x-honeycomb-team": "${HONEYCOMB_API_KEY}"},
            })
        );
        assert_eq!(
            config.service.pipelines["traces/honeycomb-hc"],
            pipeline(&[], &["otlp/honeycomb-hc"])
        );
    }

    #[test]
    fn custom_endpoint() {
        let dest = Destination::new("hc", DestinationType::Honeycomb)
            .with_data(HONEYCOMB_ENDPOINT_KEY, "api.eu1.honeycomb.io:443")
            .with_signals([Signal::Logs, Signal::Metrics]);
        let mut config = CollectorConfig::default();

        Honeycomb.modify_config(&dest, &mut config);

        assert_eq!(
            config.exporters["otlp/honeycomb-hc"]["endpoint"],
            json!("api.eu1.honeycomb.io:443")
        );
        assert_eq!(
            config.service.pipelines.keys().collect::<Vec<_>>(),
            vec!["logs/honeycomb-hc", "metrics/honeycomb-hc"]
        );
    }

    #[test]
    fn no_signals() {
        let dest = Destination::new("hc", DestinationType::Honeycomb);
        let mut config = CollectorConfig::default();

        Honeycomb.modify_config(&dest, &mut config);

        assert_untouched(&config);
    }
}

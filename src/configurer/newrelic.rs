use super::{component_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{enabled_signals, Destination, DestinationType};
use serde_json::json;
use tracing::info;

const NEWRELIC_ENDPOINT_KEY: &str = "NEWRELIC_ENDPOINT";
const NEWRELIC_API_KEY_PLACEHOLDER: &str = "${NEWRELIC_API_KEY}";
const OTLP_GRPC_PORT: u16 = 4317;
const VENDOR: &str = "newrelic";

/// Exports every signal through OTLP authenticated with a license key header.
pub struct NewRelic;

impl DestinationConfigurer for NewRelic {
    fn dest_type(&self) -> DestinationType {
        DestinationType::NewRelic
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        let signals = enabled_signals(dest);
        if signals.is_empty() {
            info!(destination = %dest.name, "New Relic destination has no enabled signals, skipping");
            return;
        }

        let Some(endpoint) = dest.get(NEWRELIC_ENDPOINT_KEY) else {
            info!(
                destination = %dest.name,
                "New Relic endpoint not specified, gateway will not be configured for New Relic"
            );
            return;
        };

        let exporter_name = component_name("otlp", VENDOR, &dest.name);
        config.exporters.insert(
            exporter_name.clone(),
            json!({
                "endpoint": format!("{endpoint}:{OTLP_GRPC_PORT}"),
                "headers": {
                    "api-key": NEWRELIC_API_KEY_PLACEHOLDER,
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
    fn all_signals() {
        let dest = Destination::new("prod", DestinationType::NewRelic)
            .with_data(NEWRELIC_ENDPOINT_KEY, "https://otlp.nr-data.net")
            .with_signals([Signal::Traces, Signal::Metrics, Signal::Logs]);
        let mut config = CollectorConfig::default();

        NewRelic.modify_config(&dest, &mut config);

        assert_eq!(
            config.exporters["otlp/newrelic-prod"],
            json!({
                "endpoint": "https://otlp.nr-data.net:4317",
                "headers": {"api-key": "${NEWRELIC_API_KEY}"},
            })
        );
        for name in ["traces/newrelic-prod", "metrics/newrelic-prod", "logs/newrelic-prod"] {
            assert_eq!(
                config.service.pipelines[name],
                pipeline(&[], &["otlp/newrelic-prod"])
            );
        }
        assert!(config.extensions.is_empty());
        assert!(config.processors.is_empty());
    }

    #[test]
    fn only_metrics() {
        let dest = Destination::new("prod", DestinationType::NewRelic)
            .with_data(NEWRELIC_ENDPOINT_KEY, "otlp.nr-data.net")
            .with_signals([Signal::Metrics]);
        let mut config = CollectorConfig::default();

        NewRelic.modify_config(&dest, &mut config);

        assert_eq!(
            config.service.pipelines.keys().collect::<Vec<_>>(),
            vec!["metrics/newrelic-prod"]
        );
    }

    #[test]
    fn missing_endpoint() {
        let dest = Destination::new("prod", DestinationType::NewRelic).with_signals([Signal::Traces]);
        let mut config = CollectorConfig::default();

        NewRelic.modify_config(&dest, &mut config);

        assert_untouched(&config);
    }
}

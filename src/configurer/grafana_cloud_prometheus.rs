use super::validators::{
    parse_external_labels, parse_label_list, resource_attribute_statement, EndpointValidator,
};
use super::{component_name, extension_name, DestinationConfigurer};
use crate::collector_config::{CollectorConfig, Pipeline};
use crate::destination::{is_metrics_enabled, Destination, DestinationType, Signal};
use serde_json::json;
use tracing::{error, info};

const GRAFANA_CLOUD_PROMETHEUS_RW_ENDPOINT_KEY: &str = "GRAFANA_CLOUD_PROMETHEUS_RW_ENDPOINT";
const GRAFANA_CLOUD_PROMETHEUS_USERNAME_KEY: &str = "GRAFANA_CLOUD_PROMETHEUS_USERNAME";
const PROMETHEUS_RESOURCE_ATTRIBUTES_LABELS_KEY: &str = "PROMETHEUS_RESOURCE_ATTRIBUTES_LABELS";
const PROMETHEUS_EXTERNAL_LABELS_KEY: &str = "PROMETHEUS_RESOURCE_EXTERNAL_LABELS";
const GRAFANA_CLOUD_PROMETHEUS_PASSWORD_PLACEHOLDER: &str = "${GRAFANA_CLOUD_PROMETHEUS_PASSWORD}";
const VENDOR: &str = "grafana";

const PROMETHEUS_RW_ENDPOINT: EndpointValidator = EndpointValidator::https("/api/prom/push");

/// Remote writes metrics to Grafana Cloud Prometheus using basic auth.
pub struct GrafanaCloudPrometheus;

impl DestinationConfigurer for GrafanaCloudPrometheus {
    fn dest_type(&self) -> DestinationType {
        DestinationType::GrafanaCloudPrometheus
    }

    fn modify_config(&self, dest: &Destination, config: &mut CollectorConfig) {
        if !is_metrics_enabled(dest) {
            info!(
                destination = %dest.name,
                "Metrics not enabled, gateway will not be configured for grafana cloud prometheus"
            );
            return;
        }

        let Some(raw_endpoint) = dest.get(GRAFANA_CLOUD_PROMETHEUS_RW_ENDPOINT_KEY) else {
            info!(
                destination = %dest.name,
                "Grafana Cloud Prometheus remote write endpoint not specified, gateway will not be configured for Prometheus"
            );
            return;
        };

        let endpoint = match PROMETHEUS_RW_ENDPOINT.validate(raw_endpoint) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                error!(
                    destination = %dest.name,
                    "failed to validate grafana cloud prometheus remote write endpoint, gateway will not be configured for Prometheus: {err}"
                );
                return;
            }
        };

        let Some(username) = dest.get(GRAFANA_CLOUD_PROMETHEUS_USERNAME_KEY) else {
            info!(
                destination = %dest.name,
                "Grafana Cloud Prometheus username not specified, gateway will not be configured for Prometheus"
            );
            return;
        };

        let labels = match parse_label_list(dest.get(PROMETHEUS_RESOURCE_ATTRIBUTES_LABELS_KEY)) {
            Ok(labels) => labels,
            Err(err) => {
                error!(
                    destination = %dest.name,
                    "failed to parse grafana cloud prometheus resource attributes labels, gateway will not be configured for Prometheus: {err}"
                );
                return;
            }
        };

        let external_labels = match parse_external_labels(dest.get(PROMETHEUS_EXTERNAL_LABELS_KEY))
        {
            Ok(external_labels) => external_labels,
            Err(err) => {
                error!(
                    destination = %dest.name,
                    "failed to parse grafana cloud prometheus external labels, gateway will not be configured for Prometheus: {err}"
                );
                return;
            }
        };

        let auth_extension_name = extension_name("basicauth", VENDOR, &dest.name);
        config.add_extension(
            auth_extension_name.clone(),
            json!({
                "client_auth": {
                    "username": username,
                    "password": GRAFANA_CLOUD_PROMETHEUS_PASSWORD_PLACEHOLDER,
                },
            }),
        );

        let mut exporter = json!({
            "endpoint": endpoint,
            "add_metric_suffixes": false,
            "auth": {
                "authenticator": auth_extension_name,
            },
        });
        if let Some(external_labels) = external_labels {
            exporter["external_labels"] = json!(external_labels);
        }
        let exporter_name = component_name("prometheusremotewrite", VENDOR, &dest.name);
        config.exporters.insert(exporter_name.clone(), exporter);

        let mut processor_names = Vec::new();
        if !labels.is_empty() {
            let processor_name = component_name("transform", VENDOR, &dest.name);
            config
                .processors
                .insert(processor_name.clone(), resource_attributes_processor(&labels));
            processor_names.push(processor_name);
        }

        config.service.pipelines.insert(
            Signal::Metrics.pipeline_name(VENDOR, &dest.name),
            Pipeline::new(processor_names, vec![exporter_name]),
        );
    }
}

/// Promotes the given resource attributes to data point attributes so they become labels.
fn resource_attributes_processor(labels: &[String]) -> serde_json::Value {
    let statements: Vec<String> = labels
        .iter()
        .map(|label| resource_attribute_statement(label))
        .collect();

    json!({
        "metric_statements": [
            {
                "context": "datapoint",
                "statements": statements,
            }
        ],
    })
}

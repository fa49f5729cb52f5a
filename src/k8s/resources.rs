//! Custom resources the gateway reads from and reports to.

use crate::destination::{Destination, Signal};
use crate::processor::ProcessorDeclaration;
use crate::sizing::CollectorGatewaySettings;
use kube::{CustomResource, ResourceExt};
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Export target declared by the user. Sensitive values live in the referenced secret and are
/// injected into the collector environment.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "newrelic.com",
    version = "v1alpha1",
    kind = "Destination",
    root = "DestinationResource",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSpec {
    #[serde(rename = "type")]
    pub dest_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SecretRef {
    pub name: String,
}

impl From<&DestinationResource> for Destination {
    fn from(resource: &DestinationResource) -> Self {
        Destination {
            name: resource.name_any(),
            dest_type: resource.spec.dest_type.clone(),
            data: resource.spec.data.clone(),
            signals: resource.spec.signals.clone(),
            secret_ref: resource.spec.secret_ref.as_ref().map(|s| s.name.clone()),
        }
    }
}

#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "newrelic.com",
    version = "v1alpha1",
    kind = "Processor",
    root = "ProcessorResource",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorSpec {
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
    #[serde(default)]
    pub order_hint: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub processor_config: Option<serde_json::Value>,
}

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true,
    })
}

impl From<&ProcessorResource> for ProcessorDeclaration {
    fn from(resource: &ProcessorResource) -> Self {
        ProcessorDeclaration {
            name: resource.name_any(),
            processor_type: resource.spec.processor_type.clone(),
            signals: resource.spec.signals.clone(),
            order_hint: resource.spec.order_hint,
            disabled: resource.spec.disabled,
            config: resource
                .spec
                .processor_config
                .clone()
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CollectorsGroupRole {
    #[serde(rename = "CLUSTER_GATEWAY")]
    ClusterGateway,
    #[serde(rename = "NODE_COLLECTOR")]
    NodeCollector,
}

/// Group of collectors deployed with a single role. The one with the gateway role drives the
/// reconciliation and reports whether the gateway is ready.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "newrelic.com",
    version = "v1alpha1",
    kind = "CollectorsGroup",
    status = "CollectorsGroupStatus",
    namespaced
)]
pub struct CollectorsGroupSpec {
    pub role: CollectorsGroupRole,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct CollectorsGroupStatus {
    #[serde(default)]
    pub ready: bool,
}

impl CollectorsGroup {
    pub fn is_gateway(&self) -> bool {
        self.spec.role == CollectorsGroupRole::ClusterGateway
    }
}

/// Cluster wide collector settings.
#[derive(CustomResource, Debug, Default, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "newrelic.com",
    version = "v1alpha1",
    kind = "CollectorSettings",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSettingsSpec {
    #[serde(default)]
    pub collector_gateway: CollectorGatewaySettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn destination_from_resource() {
        let resource: DestinationResource = serde_yaml::from_str(
            r#"
apiVersion: newrelic.com/v1alpha1
kind: Destination
metadata:
  name: loki
  namespace: newrelic
spec:
  type: grafanacloudloki
  signals: [LOGS]
  data:
    GRAFANA_CLOUD_LOKI_USERNAME: "1234"
  secretRef:
    name: loki-secret
"#,
        )
        .unwrap();

        assert_eq!(
            Destination::from(&resource),
            Destination {
                name: "loki".to_string(),
                dest_type: "grafanacloudloki".to_string(),
                data: BTreeMap::from([(
                    "GRAFANA_CLOUD_LOKI_USERNAME".to_string(),
                    "1234".to_string()
                )]),
                signals: BTreeSet::from([Signal::Logs]),
                secret_ref: Some("loki-secret".to_string()),
            }
        );
    }

    #[test]
    fn processor_from_resource() {
        let resource: ProcessorResource = serde_yaml::from_str(
            r#"
apiVersion: newrelic.com/v1alpha1
kind: Processor
metadata:
  name: sampler
spec:
  type: probabilistic_sampler
  signals: [TRACES]
  orderHint: 3
  processorConfig:
    sampling_percentage: 20
"#,
        )
        .unwrap();

        let declaration = ProcessorDeclaration::from(&resource);

        assert_eq!(declaration.component_name(), "probabilistic_sampler/sampler");
        assert_eq!(declaration.order_hint, 3);
        assert!(!declaration.disabled);
        assert_eq!(declaration.config, json!({"sampling_percentage": 20}));
    }

    #[test]
    fn collectors_group_role() {
        let group: CollectorsGroup = serde_yaml::from_str(
            r#"
apiVersion: newrelic.com/v1alpha1
kind: CollectorsGroup
metadata:
  name: gateway
spec:
  role: CLUSTER_GATEWAY
"#,
        )
        .unwrap();

        assert!(group.is_gateway());
        assert_eq!(group.status, None);
    }

    #[test]
    fn settings_defaults() {
        let settings: CollectorSettings = serde_yaml::from_str(
            r#"
apiVersion: newrelic.com/v1alpha1
kind: CollectorSettings
metadata:
  name: settings
spec:
  collectorGateway:
    requestMemoryMiB: 700
"#,
        )
        .unwrap();

        assert_eq!(settings.spec.collector_gateway.request_memory_mib, Some(700));
        assert_eq!(settings.spec.collector_gateway.limit_memory_mib, None);
    }
}

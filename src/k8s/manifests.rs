//! Builders of the objects making up the gateway deployment. They are pure so the same inputs
//! always produce the same objects, which keeps server side apply idempotent.

use super::labels::DefaultLabels;
use crate::sizing::GatewaySizing;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Key of the gateway ConfigMap holding the collector configuration.
pub const COLLECTOR_CONFIG_KEY: &str = "collector-conf";
pub const CONFIG_HASH_ANNOTATION: &str = "newrelic.com/collector-config-hash";
const CONFIG_VOLUME_NAME: &str = "collector-conf";
const CONFIG_MOUNT_PATH: &str = "/conf";
const CONTAINER_NAME: &str = "gateway";
const OTLP_GRPC_PORT: i32 = 4317;
const OTLP_HTTP_PORT: i32 = 4318;

/// Identity and placement of the gateway objects.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayManifests {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: i32,
    pub image_pull_secrets: Vec<String>,
    /// Ties the generated objects to the gateway CollectorsGroup.
    pub owner: Option<OwnerReference>,
}

impl GatewayManifests {
    fn labels(&self) -> DefaultLabels {
        DefaultLabels::new().with_name(&self.name)
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels().get()),
            owner_references: self.owner.clone().map(|owner| vec![owner]),
            ..Default::default()
        }
    }

    pub fn config_map(&self, collector_config: &str) -> ConfigMap {
        ConfigMap {
            metadata: self.metadata(),
            data: Some(BTreeMap::from([(
                COLLECTOR_CONFIG_KEY.to_string(),
                collector_config.to_string(),
            )])),
            ..Default::default()
        }
    }

    pub fn service(&self) -> Service {
        let port = |name: &str, number: i32| ServicePort {
            name: Some(name.to_string()),
            port: number,
            target_port: Some(IntOrString::Int(number)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        };

        Service {
            metadata: self.metadata(),
            spec: Some(ServiceSpec {
                selector: Some(self.labels().selector()),
                ports: Some(vec![
                    port("otlp", OTLP_GRPC_PORT),
                    port("otlphttp", OTLP_HTTP_PORT),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Deployment running the collector with the given configuration mounted.
    ///
    /// `env_secrets` are injected whole into the collector environment so the placeholders in
    /// the configuration resolve. The configuration hash is added to the pod template so any
    /// change rolls the pods.
    pub fn deployment(
        &self,
        collector_config: &str,
        sizing: &GatewaySizing,
        env_secrets: &[String],
    ) -> Result<Deployment, serde_json::Error> {
        let labels = self.labels();
        let env_from: Vec<_> = env_secrets
            .iter()
            .map(|secret| json!({"secretRef": {"name": secret}}))
            .collect();
        let image_pull_secrets: Vec<_> = self
            .image_pull_secrets
            .iter()
            .map(|secret| json!({"name": secret}))
            .collect();

        let mut deployment: Deployment = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "spec": {
                "replicas": self.replicas,
                "selector": {"matchLabels": labels.selector()},
                "template": {
                    "metadata": {
                        "labels": labels.get(),
                        "annotations": {CONFIG_HASH_ANNOTATION: config_hash(collector_config)},
                    },
                    "spec": {
                        "imagePullSecrets": image_pull_secrets,
                        "containers": [{
                            "name": CONTAINER_NAME,
                            "image": self.image,
                            "args": [format!("--config={CONFIG_MOUNT_PATH}/{COLLECTOR_CONFIG_KEY}.yaml")],
                            "ports": [
                                {"name": "otlp", "containerPort": OTLP_GRPC_PORT},
                                {"name": "otlphttp", "containerPort": OTLP_HTTP_PORT},
                            ],
                            "env": [{"name": "GOMEMLIMIT", "value": sizing.go_mem_limit()}],
                            "envFrom": env_from,
                            "resources": {
                                "requests": {"memory": format!("{}Mi", sizing.request_memory_mib)},
                                "limits": {"memory": format!("{}Mi", sizing.limit_memory_mib)},
                            },
                            "volumeMounts": [{
                                "name": CONFIG_VOLUME_NAME,
                                "mountPath": CONFIG_MOUNT_PATH,
                            }],
                        }],
                        "volumes": [{
                            "name": CONFIG_VOLUME_NAME,
                            "configMap": {
                                "name": self.name,
                                "items": [{
                                    "key": COLLECTOR_CONFIG_KEY,
                                    "path": format!("{COLLECTOR_CONFIG_KEY}.yaml"),
                                }],
                            },
                        }],
                    },
                },
            },
        }))?;
        deployment.metadata = self.metadata();

        Ok(deployment)
    }
}

fn config_hash(collector_config: &str) -> String {
    format!("{:x}", Sha256::digest(collector_config.as_bytes()))
}

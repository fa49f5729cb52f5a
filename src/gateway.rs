//! Reconciliation of the gateway collector: every pass reads the declared destinations and
//! processors, synthesizes the collector configuration and applies the objects running it.

pub mod controller;

use crate::config::GatewayDeploymentConfig;
use crate::configurer::ConfigurerRegistry;
use crate::destination::Destination;
use crate::k8s::error::K8sError;
use crate::k8s::manifests::GatewayManifests;
use crate::k8s::resources::CollectorsGroup;
use crate::processor::ProcessorDeclaration;
use crate::sizing::{CollectorGatewaySettings, GatewaySizing};
use crate::synthesis::{ConfigSynthesizer, SynthesisError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{Resource, ResourceExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Cluster operations needed by a reconciliation pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayCluster {
    /// Returns the collectors group with the gateway role, if any.
    async fn find_gateway(&self) -> Result<Option<CollectorsGroup>, K8sError>;
    async fn list_destinations(&self) -> Result<Vec<Destination>, K8sError>;
    async fn list_processors(&self) -> Result<Vec<ProcessorDeclaration>, K8sError>;
    /// Gateway settings, defaulted when no settings object exists.
    async fn get_settings(&self) -> Result<CollectorGatewaySettings, K8sError>;
    async fn apply_config_map(&self, config_map: ConfigMap) -> Result<(), K8sError>;
    async fn apply_service(&self, service: Service) -> Result<(), K8sError>;
    /// Applies the deployment and returns it as stored by the cluster, status included.
    async fn apply_deployment(&self, deployment: Deployment) -> Result<Deployment, K8sError>;
    async fn patch_gateway_status(&self, gateway: &str, ready: bool) -> Result<(), K8sError>;
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("cluster operation failed: {0}")]
    Cluster(#[from] K8sError),
    #[error("config synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("rendering collector config: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("building gateway manifests: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Outcome of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// No collectors group requests a gateway, nothing was applied.
    NoGateway,
    Synced { ready: bool },
}

/// Runs reconciliation passes against a cluster. No state is kept between passes.
pub struct GatewaySync<C> {
    cluster: C,
    registry: Arc<ConfigurerRegistry>,
    namespace: String,
    deployment: GatewayDeploymentConfig,
}

impl<C> GatewaySync<C>
where
    C: GatewayCluster,
{
    pub fn new(
        cluster: C,
        registry: Arc<ConfigurerRegistry>,
        namespace: &str,
        deployment: GatewayDeploymentConfig,
    ) -> Self {
        Self {
            cluster,
            registry,
            namespace: namespace.to_string(),
            deployment,
        }
    }

    pub async fn sync(&self) -> Result<GatewayState, SyncError> {
        let Some(gateway) = self.cluster.find_gateway().await? else {
            debug!("no collectors group with the gateway role, skipping");
            return Ok(GatewayState::NoGateway);
        };
        let gateway_name = gateway.name_any();

        let destinations = self.cluster.list_destinations().await?;
        let processors = self.cluster.list_processors().await?;
        let settings = self.cluster.get_settings().await?;
        let sizing = GatewaySizing::from_settings(&settings);

        let config = ConfigSynthesizer::new(self.registry.clone())
            .with_memory_limiter(sizing.memory_limiter())
            .synthesize(&destinations, &processors)?;
        let rendered = config.to_yaml()?;

        let manifests = self.manifests(&gateway);
        let config_map = manifests.config_map(&rendered);
        let service = manifests.service();
        let deployment = manifests.deployment(&rendered, &sizing, &env_secrets(&destinations))?;

        self.cluster.apply_config_map(config_map).await?;
        self.cluster.apply_service(service).await?;
        let deployment = self.cluster.apply_deployment(deployment).await?;

        let ready = is_ready(&deployment);
        self.cluster
            .patch_gateway_status(&gateway_name, ready)
            .await?;

        info!(
            gateway = %gateway_name,
            destinations = destinations.len(),
            pipelines = config.service.pipelines.len(),
            ready,
            "gateway synced"
        );
        Ok(GatewayState::Synced { ready })
    }

    fn manifests(&self, gateway: &CollectorsGroup) -> GatewayManifests {
        GatewayManifests {
            name: self.deployment.name.clone(),
            namespace: self.namespace.clone(),
            image: self.deployment.image.clone(),
            replicas: self.deployment.replicas,
            image_pull_secrets: self.deployment.image_pull_secrets.clone(),
            owner: gateway.controller_owner_ref(&()),
        }
    }
}

/// Secrets referenced by the destinations, without duplicates and in a stable order.
fn env_secrets(destinations: &[Destination]) -> Vec<String> {
    destinations
        .iter()
        .filter_map(|d| d.secret_ref.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn is_ready(deployment: &Deployment) -> bool {
    deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or_default()
        > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::{DestinationType, Signal};
    use crate::k8s::manifests::COLLECTOR_CONFIG_KEY;
    use crate::k8s::resources::{CollectorsGroupRole, CollectorsGroupSpec};
    use assert_matches::assert_matches;
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn gateway() -> CollectorsGroup {
        CollectorsGroup::new(
            "gateway",
            CollectorsGroupSpec {
                role: CollectorsGroupRole::ClusterGateway,
            },
        )
    }

    fn destinations() -> Vec<Destination> {
        vec![
            Destination::new("nr", DestinationType::NewRelic)
                .with_data("NEWRELIC_ENDPOINT", "otlp.nr-data.net")
                .with_signals([Signal::Traces, Signal::Logs])
                .with_secret_ref("nr-secret"),
            Destination::new("sentry", DestinationType::Sentry)
                .with_signals([Signal::Traces])
                .with_secret_ref("nr-secret"),
        ]
    }

    fn gateway_sync<C: GatewayCluster>(cluster: C) -> GatewaySync<C> {
        GatewaySync::new(
            cluster,
            Arc::new(ConfigurerRegistry::default()),
            "newrelic",
            GatewayDeploymentConfig::default(),
        )
    }

    fn deployment_with_ready_replicas(ready_replicas: Option<i32>) -> Deployment {
        Deployment {
            status: Some(DeploymentStatus {
                ready_replicas,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Mock expecting a full pass over the given destinations.
    fn mock_full_pass(applied_deployment: Deployment, ready: bool) -> MockGatewayCluster {
        let mut cluster = MockGatewayCluster::new();
        cluster
            .expect_find_gateway()
            .once()
            .returning(|| Ok(Some(gateway())));
        cluster
            .expect_list_destinations()
            .once()
            .returning(|| Ok(destinations()));
        cluster
            .expect_list_processors()
            .once()
            .returning(|| Ok(vec![]));
        cluster
            .expect_get_settings()
            .once()
            .returning(|| Ok(CollectorGatewaySettings::default()));
        cluster
            .expect_apply_config_map()
            .once()
            .returning(|_| Ok(()));
        cluster
            .expect_apply_service()
            .once()
            .returning(|_| Ok(()));
        cluster
            .expect_apply_deployment()
            .once()
            .return_once(move |_| Ok(applied_deployment));
        cluster
            .expect_patch_gateway_status()
            .with(eq("gateway"), eq(ready))
            .once()
            .returning(|_, _| Ok(()));
        cluster
    }

    #[tokio::test]
    async fn no_gateway_is_a_noop() {
        let mut cluster = MockGatewayCluster::new();
        cluster.expect_find_gateway().once().returning(|| Ok(None));
        // Any other call fails the test since no expectation is set.

        assert_eq!(
            gateway_sync(cluster).sync().await.unwrap(),
            GatewayState::NoGateway
        );
    }

    #[tokio::test]
    async fn readiness_from_ready_replicas() {
        for (ready_replicas, ready) in [(None, false), (Some(0), false), (Some(1), true)] {
            let cluster = mock_full_pass(deployment_with_ready_replicas(ready_replicas), ready);

            assert_eq!(
                gateway_sync(cluster).sync().await.unwrap(),
                GatewayState::Synced { ready },
                "ready replicas: {ready_replicas:?}"
            );
        }
    }

    #[tokio::test]
    async fn synthesis_error_applies_nothing() {
        let mut cluster = MockGatewayCluster::new();
        cluster
            .expect_find_gateway()
            .once()
            .returning(|| Ok(Some(gateway())));
        cluster.expect_list_destinations().once().returning(|| {
            let mut unknown = Destination::new("dd", DestinationType::NewRelic);
            unknown.dest_type = "datadog".to_string();
            Ok(vec![unknown])
        });
        cluster
            .expect_list_processors()
            .once()
            .returning(|| Ok(vec![]));
        cluster
            .expect_get_settings()
            .once()
            .returning(|| Ok(CollectorGatewaySettings::default()));
        cluster.expect_apply_config_map().never();
        cluster.expect_apply_service().never();
        cluster.expect_apply_deployment().never();
        cluster.expect_patch_gateway_status().never();

        assert_matches!(
            gateway_sync(cluster).sync().await,
            Err(SyncError::Synthesis(_))
        );
    }

    #[tokio::test]
    async fn malformed_processor_applies_nothing() {
        let mut cluster = MockGatewayCluster::new();
        cluster
            .expect_find_gateway()
            .once()
            .returning(|| Ok(Some(gateway())));
        cluster
            .expect_list_destinations()
            .once()
            .returning(|| Ok(destinations()));
        cluster.expect_list_processors().once().returning(|| {
            Ok(vec![ProcessorDeclaration::new("sampler", "probabilistic_sampler")
                .with_signals([Signal::Traces])
                .with_config(json!(["not", "an", "object"]))])
        });
        cluster
            .expect_get_settings()
            .once()
            .returning(|| Ok(CollectorGatewaySettings::default()));
        cluster.expect_apply_config_map().never();
        cluster.expect_apply_deployment().never();

        assert_matches!(
            gateway_sync(cluster).sync().await,
            Err(SyncError::Synthesis(SynthesisError::ProcessorDeclaration(_)))
        );
    }

    #[tokio::test]
    async fn cluster_error_aborts_the_pass() {
        let mut cluster = MockGatewayCluster::new();
        cluster
            .expect_find_gateway()
            .once()
            .returning(|| Ok(Some(gateway())));
        cluster
            .expect_list_destinations()
            .once()
            .returning(|| Ok(destinations()));
        cluster
            .expect_list_processors()
            .once()
            .returning(|| Ok(vec![]));
        cluster
            .expect_get_settings()
            .once()
            .returning(|| Ok(CollectorGatewaySettings::default()));
        cluster
            .expect_apply_config_map()
            .once()
            .returning(|_| Err(K8sError::MissingName("ConfigMap".to_string())));
        cluster.expect_apply_service().never();
        cluster.expect_apply_deployment().never();
        cluster.expect_patch_gateway_status().never();

        assert_matches!(
            gateway_sync(cluster).sync().await,
            Err(SyncError::Cluster(K8sError::MissingName(_)))
        );
    }

    /// Cluster keeping the last applied objects in memory and counting the ones that changed.
    #[derive(Default)]
    struct InMemoryCluster {
        objects: Mutex<BTreeMap<String, serde_json::Value>>,
        changes: Mutex<usize>,
    }

    impl InMemoryCluster {
        fn store<T: serde::Serialize>(&self, key: &str, obj: &T) {
            let value = serde_json::to_value(obj).unwrap();
            let previous = self
                .objects
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            if previous != Some(value) {
                *self.changes.lock().unwrap() += 1;
            }
        }

        fn changes(&self) -> usize {
            *self.changes.lock().unwrap()
        }
    }

    #[async_trait]
    impl GatewayCluster for InMemoryCluster {
        async fn find_gateway(&self) -> Result<Option<CollectorsGroup>, K8sError> {
            Ok(Some(gateway()))
        }
        async fn list_destinations(&self) -> Result<Vec<Destination>, K8sError> {
            Ok(destinations())
        }
        async fn list_processors(&self) -> Result<Vec<ProcessorDeclaration>, K8sError> {
            Ok(vec![ProcessorDeclaration::new("drop", "filter")
                .with_signals([Signal::Logs])])
        }
        async fn get_settings(&self) -> Result<CollectorGatewaySettings, K8sError> {
            Ok(CollectorGatewaySettings::default())
        }
        async fn apply_config_map(&self, config_map: ConfigMap) -> Result<(), K8sError> {
            self.store("configmap", &config_map);
            Ok(())
        }
        async fn apply_service(&self, service: Service) -> Result<(), K8sError> {
            self.store("service", &service);
            Ok(())
        }
        async fn apply_deployment(&self, deployment: Deployment) -> Result<Deployment, K8sError> {
            self.store("deployment", &deployment);
            Ok(deployment)
        }
        async fn patch_gateway_status(&self, gateway: &str, ready: bool) -> Result<(), K8sError> {
            self.store(&format!("status/{gateway}"), &ready);
            Ok(())
        }
    }

    #[tokio::test]
    async fn repeated_passes_are_idempotent() {
        let sync = gateway_sync(InMemoryCluster::default());

        assert_eq!(sync.sync().await.unwrap(), GatewayState::Synced { ready: false });
        assert_eq!(sync.cluster.changes(), 4);

        sync.sync().await.unwrap();
        sync.sync().await.unwrap();
        assert_eq!(sync.cluster.changes(), 4);

        let objects = sync.cluster.objects.lock().unwrap();
        let rendered = objects["configmap"]["data"][COLLECTOR_CONFIG_KEY]
            .as_str()
            .unwrap();
        assert!(rendered.contains("otlp/newrelic-nr"));
        assert!(rendered.contains("filter/drop"));
        assert_eq!(
            objects["deployment"]["spec"]["template"]["spec"]["containers"][0]["envFrom"],
            json!([{"secretRef": {"name": "nr-secret"}}])
        );
    }
}

use super::error::K8sError;
use super::resources::{CollectorSettings, CollectorsGroup, DestinationResource, ProcessorResource};
use crate::destination::Destination;
use crate::gateway::GatewayCluster;
use crate::processor::ProcessorDeclaration;
use crate::sizing::CollectorGatewaySettings;
use async_trait::async_trait;
use duration_str::deserialize_duration;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::{ListParams, Patch, PatchParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// Field manager used for every object the gateway applies.
pub const FIELD_MANAGER: &str = "newrelic-collector-gateway";

/// Same as upstream kube-rs default client timeout (read/write). It must stay above the watcher
/// timeout (290s) or the controller watches fail.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(295);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Read and write timeout of the requests to the API server.
    #[serde(
        default = "default_client_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "crate::config::serialize_duration"
    )]
    pub client_timeout: Duration,
}

fn default_client_timeout() -> Duration {
    DEFAULT_CLIENT_TIMEOUT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

/// Constructs a new Kubernetes client.
///
/// If loading from the inCluster config fail we fall back to kube-config
/// This will respect the `$KUBECONFIG` envvar, but otherwise default to `~/.kube/config`.
pub async fn try_new_client(client_config: &ClientConfig) -> Result<Client, K8sError> {
    debug!("trying inClusterConfig for k8s client");

    let mut config = match Config::incluster() {
        Ok(c) => c,
        Err(e) => {
            debug!("inClusterConfig {}, trying kubeconfig for k8s client", e);
            let c = KubeConfigOptions::default();
            Config::from_kubeconfig(&c).await?
        }
    };
    config.read_timeout = Some(client_config.client_timeout);
    config.write_timeout = Some(client_config.client_timeout);

    let client = Client::try_from(config)?;
    debug!("k8s client initialization succeeded");
    Ok(client)
}

/// [GatewayCluster] backed by the Kubernetes API of a single namespace.
pub struct KubeGatewayCluster {
    client: Client,
    namespace: String,
    settings_name: String,
}

impl KubeGatewayCluster {
    pub fn new(client: Client, namespace: &str, settings_name: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            settings_name: settings_name.to_string(),
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Server side applies the object with the gateway field manager, taking over conflicting
    /// fields.
    async fn apply<K>(&self, obj: K) -> Result<K, K8sError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or_else(|| K8sError::MissingName(K::kind(&Default::default()).to_string()))?;
        let api: Api<K> = self.api();
        let applied = api
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&obj),
            )
            .await?;
        debug!(name = %name, kind = %K::kind(&Default::default()), "object applied");
        Ok(applied)
    }
}

#[async_trait]
impl GatewayCluster for KubeGatewayCluster {
    async fn find_gateway(&self) -> Result<Option<CollectorsGroup>, K8sError> {
        let groups = self
            .api::<CollectorsGroup>()
            .list(&ListParams::default())
            .await?;
        Ok(groups.items.into_iter().find(CollectorsGroup::is_gateway))
    }

    async fn list_destinations(&self) -> Result<Vec<Destination>, K8sError> {
        let destinations = self
            .api::<DestinationResource>()
            .list(&ListParams::default())
            .await?;
        Ok(destinations.items.iter().map(Destination::from).collect())
    }

    async fn list_processors(&self) -> Result<Vec<ProcessorDeclaration>, K8sError> {
        let processors = self
            .api::<ProcessorResource>()
            .list(&ListParams::default())
            .await?;
        Ok(processors
            .items
            .iter()
            .map(ProcessorDeclaration::from)
            .collect())
    }

    async fn get_settings(&self) -> Result<CollectorGatewaySettings, K8sError> {
        let settings = self
            .api::<CollectorSettings>()
            .get_opt(&self.settings_name)
            .await?;
        if settings.is_none() {
            debug!(name = %self.settings_name, "collector settings not found, using defaults");
        }
        Ok(settings
            .map(|s| s.spec.collector_gateway)
            .unwrap_or_default())
    }

    async fn apply_config_map(&self, config_map: ConfigMap) -> Result<(), K8sError> {
        self.apply(config_map).await.map(|_| ())
    }

    async fn apply_service(&self, service: Service) -> Result<(), K8sError> {
        self.apply(service).await.map(|_| ())
    }

    async fn apply_deployment(&self, deployment: Deployment) -> Result<Deployment, K8sError> {
        self.apply(deployment).await
    }

    async fn patch_gateway_status(&self, gateway: &str, ready: bool) -> Result<(), K8sError> {
        let patch = json!({"status": {"ready": ready}});
        self.api::<CollectorsGroup>()
            .patch_status(gateway, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config() {
        assert_eq!(
            serde_yaml::from_str::<ClientConfig>("client_timeout: 30s").unwrap(),
            ClientConfig {
                client_timeout: Duration::from_secs(30)
            }
        );
        assert_eq!(
            serde_yaml::from_str::<ClientConfig>("{}").unwrap(),
            ClientConfig::default()
        );
    }
}

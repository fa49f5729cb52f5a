use super::grafana_cloud_loki::GrafanaCloudLoki;
use super::grafana_cloud_prometheus::GrafanaCloudPrometheus;
use super::honeycomb::Honeycomb;
use super::jaeger::Jaeger;
use super::newrelic::NewRelic;
use super::quickwit::Quickwit;
use super::sentry::Sentry;
use super::splunk::Splunk;
use super::DestinationConfigurer;
use crate::destination::{DestinationType, UnknownDestinationType};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("{0}")]
    UnknownDestinationType(#[from] UnknownDestinationType),
    #[error("no configurer registered for destination type `{0}`")]
    NotRegistered(DestinationType),
    #[error("a configurer for destination type `{0}` is already registered")]
    AlreadyRegistered(DestinationType),
}

type BoxedConfigurer = Box<dyn DestinationConfigurer + Send + Sync>;

/// Lookup of the configurer in charge of each destination type.
///
/// It is built once at start-up and only read afterwards.
pub struct ConfigurerRegistry {
    configurers: HashMap<DestinationType, BoxedConfigurer>,
}

impl ConfigurerRegistry {
    pub fn empty() -> Self {
        Self {
            configurers: HashMap::default(),
        }
    }

    pub fn register<C>(mut self, configurer: C) -> Result<Self, RegistryError>
    where
        C: DestinationConfigurer + Send + Sync + 'static,
    {
        let dest_type = configurer.dest_type();
        if self.configurers.contains_key(&dest_type) {
            return Err(RegistryError::AlreadyRegistered(dest_type));
        }
        self.configurers.insert(dest_type, Box::new(configurer));
        Ok(self)
    }

    /// Returns the configurer for a raw destination type identifier.
    pub fn get(
        &self,
        dest_type: &str,
    ) -> Result<&(dyn DestinationConfigurer + Send + Sync), RegistryError> {
        let dest_type = DestinationType::from_str(dest_type)?;
        self.configurers
            .get(&dest_type)
            .map(|c| c.as_ref())
            .ok_or(RegistryError::NotRegistered(dest_type))
    }
}

impl Default for ConfigurerRegistry {
    /// Registry holding every vendor supported by the gateway.
    fn default() -> Self {
        let configurers: [BoxedConfigurer; 8] = [
            Box::new(NewRelic),
            Box::new(Quickwit),
            Box::new(Sentry),
            Box::new(Splunk),
            Box::new(GrafanaCloudLoki),
            Box::new(GrafanaCloudPrometheus),
            Box::new(Honeycomb),
            Box::new(Jaeger),
        ];
        Self {
            configurers: configurers
                .into_iter()
                .map(|c| (c.dest_type(), c))
                .collect(),
        }
    }
}

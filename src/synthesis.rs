//! Builds the gateway collector configuration out of the destinations and processors declared
//! in the cluster.
//!
//! A synthesis pass is a pure function of its inputs: destinations are visited in a fixed order
//! and every section of the result is ordered, so the same inputs always render the same text.

use crate::collector_config::{CollectorConfig, ComponentCollision, ConfigReferenceError};
use crate::configurer::{ConfigurerRegistry, RegistryError};
use crate::destination::{Destination, Signal};
use crate::processor::{ProcessorDeclaration, ProcessorDeclarationError};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const OTLP_RECEIVER: &str = "otlp";
pub const BATCH_PROCESSOR: &str = "batch";
pub const MEMORY_LIMITER_PROCESSOR: &str = "memory_limiter";
const OTLP_GRPC_ENDPOINT: &str = "0.0.0.0:4317";
const OTLP_HTTP_ENDPOINT: &str = "0.0.0.0:4318";

#[derive(Error, Debug, PartialEq)]
pub enum SynthesisError {
    #[error("destination `{0}`: {1}")]
    Registry(String, RegistryError),
    #[error("invalid processor declaration: {0}")]
    ProcessorDeclaration(#[from] ProcessorDeclarationError),
    #[error("processor `{0}` is declared more than once")]
    DuplicatedProcessor(String),
    #[error("destination `{0}` is declared more than once")]
    DuplicatedDestination(String),
    #[error("destination `{0}`: {1}")]
    ComponentCollision(String, ComponentCollision),
    #[error("inconsistent collector configuration: {0}")]
    DanglingReference(#[from] ConfigReferenceError),
}

/// Runs synthesis passes against a fixed set of destination configurers.
#[derive(Clone)]
pub struct ConfigSynthesizer {
    registry: Arc<ConfigurerRegistry>,
    memory_limiter: Option<serde_json::Value>,
}

impl ConfigSynthesizer {
    pub fn new(registry: Arc<ConfigurerRegistry>) -> Self {
        Self {
            registry,
            memory_limiter: None,
        }
    }

    /// Places a `memory_limiter` processor with the given configuration first in every pipeline.
    pub fn with_memory_limiter(self, memory_limiter: serde_json::Value) -> Self {
        Self {
            memory_limiter: Some(memory_limiter),
            ..self
        }
    }

    /// Returns the merged collector configuration for the given destinations and processors.
    ///
    /// Destinations lacking required data are left out of the result. The whole pass fails on
    /// unknown destination types, malformed processor declarations and on names clashing
    /// between destinations or with the declared processors.
    pub fn synthesize(
        &self,
        destinations: &[Destination],
        processors: &[ProcessorDeclaration],
    ) -> Result<CollectorConfig, SynthesisError> {
        let mut config = self.baseline();

        let declared = Self::merge_processor_declarations(processors, &mut config)?;

        let mut destinations: Vec<&Destination> = destinations.iter().collect();
        destinations.sort_by(|a, b| (&a.name, &a.dest_type).cmp(&(&b.name, &b.dest_type)));
        if let Some(pair) = destinations.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(SynthesisError::DuplicatedDestination(pair[0].name.clone()));
        }

        for dest in destinations {
            let configurer = self
                .registry
                .get(&dest.dest_type)
                .map_err(|err| SynthesisError::Registry(dest.name.clone(), err))?;
            debug!(destination = %dest.name, dest_type = %dest.dest_type, "configuring destination");
            // Each destination writes on its own so it can never replace existing components.
            let mut contribution = CollectorConfig::default();
            configurer.modify_config(dest, &mut contribution);
            config
                .merge(contribution)
                .map_err(|err| SynthesisError::ComponentCollision(dest.name.clone(), err))?;
        }

        self.finalize_pipelines(&mut config, &declared);
        config.validate_references()?;

        Ok(config)
    }

    fn baseline(&self) -> CollectorConfig {
        let mut config = CollectorConfig::default();
        config.receivers.insert(
            OTLP_RECEIVER.to_string(),
            json!({
                "protocols": {
                    "grpc": {"endpoint": OTLP_GRPC_ENDPOINT},
                    "http": {"endpoint": OTLP_HTTP_ENDPOINT},
                },
            }),
        );
        config
            .processors
            .insert(BATCH_PROCESSOR.to_string(), json!({}));
        if let Some(memory_limiter) = &self.memory_limiter {
            config
                .processors
                .insert(MEMORY_LIMITER_PROCESSOR.to_string(), memory_limiter.clone());
        }
        config
    }

    /// Inserts the declared processors and returns their names per signal, in pipeline order.
    fn merge_processor_declarations(
        processors: &[ProcessorDeclaration],
        config: &mut CollectorConfig,
    ) -> Result<BTreeMap<Signal, Vec<String>>, SynthesisError> {
        let mut enabled: Vec<&ProcessorDeclaration> =
            processors.iter().filter(|p| !p.disabled).collect();
        for processor in &enabled {
            processor.validate()?;
        }
        enabled.sort_by_key(|p| (p.order_hint, p.component_name()));

        let mut declared: BTreeMap<Signal, Vec<String>> = BTreeMap::default();
        for processor in enabled {
            let name = processor.component_name();
            if config.processors.contains_key(&name) {
                return Err(SynthesisError::DuplicatedProcessor(name));
            }
            let processor_config = if processor.config.is_null() {
                json!({})
            } else {
                processor.config.clone()
            };
            config.processors.insert(name.clone(), processor_config);
            for signal in &processor.signals {
                declared.entry(*signal).or_default().push(name.clone());
            }
        }

        Ok(declared)
    }

    /// Wires the receivers and the shared processors around each destination pipeline.
    fn finalize_pipelines(
        &self,
        config: &mut CollectorConfig,
        declared: &BTreeMap<Signal, Vec<String>>,
    ) {
        for (pipeline_name, pipeline) in config.service.pipelines.iter_mut() {
            let mut processors = Vec::new();
            if self.memory_limiter.is_some() {
                processors.push(MEMORY_LIMITER_PROCESSOR.to_string());
            }
            if let Some(names) =
                Signal::from_pipeline_name(pipeline_name).and_then(|s| declared.get(&s))
            {
                processors.extend(names.iter().cloned());
            }
            processors.append(&mut pipeline.processors);
            processors.push(BATCH_PROCESSOR.to_string());

            pipeline.receivers = vec![OTLP_RECEIVER.to_string()];
            pipeline.processors = processors;
        }
    }
}

impl Default for ConfigSynthesizer {
    fn default() -> Self {
        Self::new(Arc::new(ConfigurerRegistry::default()))
    }
}

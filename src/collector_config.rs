//! Model of the collector configuration synthesized for the gateway.
//!
//! Every section is an ordered map so that serializing the same content always produces the
//! same text, which keeps the applied ConfigMap stable across reconciliations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Opaque configuration fragment of a single collector component.
pub type GenericMap = serde_json::Value;

/// Component sections, keyed by the unique component name.
pub type Components = BTreeMap<String, GenericMap>;

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<String>,
    #[serde(default)]
    pub exporters: Vec<String>,
}

impl Pipeline {
    pub fn new(processors: Vec<String>, exporters: Vec<String>) -> Self {
        Self {
            receivers: Vec::default(),
            processors,
            exporters,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub pipelines: BTreeMap<String, Pipeline>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub receivers: Components,
    #[serde(default)]
    pub exporters: Components,
    #[serde(default)]
    pub processors: Components,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: Components,
    #[serde(default)]
    pub service: Service,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigReferenceError {
    #[error("pipeline `{pipeline}` references missing {section} `{name}`")]
    DanglingPipelineReference {
        pipeline: String,
        section: &'static str,
        name: String,
    },
    #[error("pipeline `{pipeline}` lists {section} `{name}` more than once")]
    RepeatedPipelineReference {
        pipeline: String,
        section: &'static str,
        name: String,
    },
    #[error("service references missing extension `{0}`")]
    DanglingExtension(String),
}

/// A component or pipeline name already present in the configuration.
#[derive(Error, Debug, PartialEq)]
#[error("{section} `{name}` is already defined")]
pub struct ComponentCollision {
    pub section: &'static str,
    pub name: String,
}

impl CollectorConfig {
    /// Adds an extension and enables it in the service section.
    pub fn add_extension(&mut self, name: String, extension: GenericMap) {
        if !self.service.extensions.contains(&name) {
            self.service.extensions.push(name.clone());
        }
        self.extensions.insert(name, extension);
    }

    /// Moves every component and pipeline of `other` into this configuration.
    ///
    /// Nothing is moved when any name of `other` is already taken.
    pub fn merge(&mut self, other: CollectorConfig) -> Result<(), ComponentCollision> {
        let sections = [
            ("receiver", &self.receivers, &other.receivers),
            ("exporter", &self.exporters, &other.exporters),
            ("processor", &self.processors, &other.processors),
            ("extension", &self.extensions, &other.extensions),
        ];
        for (section, current, incoming) in sections {
            if let Some(name) = incoming.keys().find(|n| current.contains_key(*n)) {
                return Err(ComponentCollision {
                    section,
                    name: name.clone(),
                });
            }
        }
        if let Some(name) = other
            .service
            .pipelines
            .keys()
            .find(|n| self.service.pipelines.contains_key(*n))
        {
            return Err(ComponentCollision {
                section: "pipeline",
                name: name.clone(),
            });
        }

        self.receivers.extend(other.receivers);
        self.exporters.extend(other.exporters);
        self.processors.extend(other.processors);
        self.extensions.extend(other.extensions);
        for extension in other.service.extensions {
            if !self.service.extensions.contains(&extension) {
                self.service.extensions.push(extension);
            }
        }
        self.service.pipelines.extend(other.service.pipelines);
        Ok(())
    }

    /// Checks every name referenced from the service section exists in its owning section and
    /// is listed once per pipeline.
    pub fn validate_references(&self) -> Result<(), ConfigReferenceError> {
        for (pipeline_name, pipeline) in &self.service.pipelines {
            let references = [
                ("receiver", &pipeline.receivers, &self.receivers),
                ("processor", &pipeline.processors, &self.processors),
                ("exporter", &pipeline.exporters, &self.exporters),
            ];
            for (section, names, components) in references {
                if let Some(missing) = names.iter().find(|n| !components.contains_key(*n)) {
                    return Err(ConfigReferenceError::DanglingPipelineReference {
                        pipeline: pipeline_name.clone(),
                        section,
                        name: missing.clone(),
                    });
                }
                if let Some(repeated) = names
                    .iter()
                    .enumerate()
                    .find(|(i, n)| names[..*i].contains(*n))
                    .map(|(_, n)| n)
                {
                    return Err(ConfigReferenceError::RepeatedPipelineReference {
                        pipeline: pipeline_name.clone(),
                        section,
                        name: repeated.clone(),
                    });
                }
            }
        }

        if let Some(missing) = self
            .service
            .extensions
            .iter()
            .find(|e| !self.extensions.contains_key(*e))
        {
            return Err(ConfigReferenceError::DanglingExtension(missing.clone()));
        }

        Ok(())
    }

    /// Serializes the configuration into the collector native YAML format.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

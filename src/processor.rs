use crate::destination::Signal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// A cross-cutting processor declared apart from destinations (sampling, filtering, ...).
///
/// Its configuration is already shaped for the collector and is inserted as is.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcessorDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
    /// Lower values are placed first in the pipelines.
    #[serde(default)]
    pub order_hint: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::default())
}

#[derive(Error, Debug, PartialEq)]
pub enum ProcessorDeclarationError {
    #[error("processor declaration without name")]
    MissingName,
    #[error("processor `{0}` has no type")]
    MissingType(String),
    #[error("processor `{0}` does not target any signal")]
    NoSignals(String),
    #[error("processor `{0}` configuration must be an object")]
    InvalidConfig(String),
}

impl ProcessorDeclaration {
    pub fn new(name: &str, processor_type: &str) -> Self {
        Self {
            name: name.to_string(),
            processor_type: processor_type.to_string(),
            signals: BTreeSet::default(),
            order_hint: 0,
            disabled: false,
            config: empty_object(),
        }
    }

    pub fn with_signals<I: IntoIterator<Item = Signal>>(mut self, signals: I) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    pub fn with_order_hint(mut self, order_hint: i32) -> Self {
        self.order_hint = order_hint;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Name of the processor in the collector configuration.
    pub fn component_name(&self) -> String {
        format!("{}/{}", self.processor_type, self.name)
    }

    /// Checks the declaration can be merged into a collector configuration.
    pub fn validate(&self) -> Result<(), ProcessorDeclarationError> {
        if self.name.trim().is_empty() {
            return Err(ProcessorDeclarationError::MissingName);
        }
        if self.processor_type.trim().is_empty() {
            return Err(ProcessorDeclarationError::MissingType(self.name.clone()));
        }
        if self.signals.is_empty() {
            return Err(ProcessorDeclarationError::NoSignals(self.name.clone()));
        }
        // A null config is the same as an empty one for the collector.
        if !(self.config.is_object() || self.config.is_null()) {
            return Err(ProcessorDeclarationError::InvalidConfig(self.name.clone()));
        }
        Ok(())
    }
}

use std::collections::BTreeMap;

pub const MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VAL: &str = "newrelic-collector-gateway";
pub const NAME_KEY: &str = "app.kubernetes.io/name";
pub const COMPONENT_KEY: &str = "app.kubernetes.io/component";
pub const COMPONENT_VAL: &str = "collector-gateway";

/// Collection of labels used to identify the gateway resources.
#[derive(Debug, Clone, Default)]
pub struct DefaultLabels(BTreeMap<String, String>);

impl DefaultLabels {
    pub fn new() -> Self {
        DefaultLabels(BTreeMap::from([
            (MANAGED_BY_KEY.to_string(), MANAGED_BY_VAL.to_string()),
            (COMPONENT_KEY.to_string(), COMPONENT_VAL.to_string()),
        ]))
    }

    /// Adds the gateway name label to the set.
    pub fn with_name(mut self, name: &str) -> Self {
        self.0.insert(NAME_KEY.to_string(), name.to_string());
        self
    }

    pub fn get(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }

    /// Subset of labels selecting the gateway pods. Kept minimal since the deployment selector
    /// is immutable.
    pub fn selector(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != MANAGED_BY_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_excludes_managed_by() {
        let labels = DefaultLabels::new().with_name("gateway");

        assert_eq!(labels.get().len(), 3);
        assert_eq!(
            labels.selector(),
            BTreeMap::from([
                (COMPONENT_KEY.to_string(), COMPONENT_VAL.to_string()),
                (NAME_KEY.to_string(), "gateway".to_string()),
            ])
        );
    }
}

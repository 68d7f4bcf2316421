//! Namespaced option-setting table for hosting environments

use crate::{Properties, Property, Value};
use serde::{Deserialize, Serialize};

/// A namespace:option pair was set twice
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("option {namespace}:{option_name} is already set")]
pub struct DuplicateOption {
    pub namespace: String,
    pub option_name: String,
}

/// One environment option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: Value,
}

/// Option table where every namespace:option pair appears at most once.
///
/// Entries keep insertion order so rendered templates read in the order the
/// composer declared them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionSettings {
    entries: Vec<OptionSetting>,
}

impl OptionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        namespace: &str,
        option_name: &str,
        value: impl Into<Value>,
    ) -> Result<(), DuplicateOption> {
        if self.get(namespace, option_name).is_some() {
            return Err(DuplicateOption {
                namespace: namespace.to_string(),
                option_name: option_name.to_string(),
            });
        }
        self.entries.push(OptionSetting {
            namespace: namespace.to_string(),
            option_name: option_name.to_string(),
            value: value.into(),
        });
        Ok(())
    }

    pub fn get(&self, namespace: &str, option_name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.namespace == namespace && e.option_name == option_name)
            .map(|e| &e.value)
    }

    /// All options of one namespace, in declaration order
    pub fn in_namespace<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a OptionSetting> + 'a {
        self.entries.iter().filter(move |e| e.namespace == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionSetting> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as the `OptionSettings` list of an environment resource
    pub fn to_property(&self) -> Property {
        Property::list(self.entries.iter().map(|e| {
            Properties::new()
                .with("Namespace", e.namespace.as_str())
                .with("OptionName", e.option_name.as_str())
                .with("Value", e.value.clone())
        }))
    }
}

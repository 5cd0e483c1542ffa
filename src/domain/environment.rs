use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values from one data row; JSON so rows may carry nested objects.
pub type RowVars = serde_json::Map<String, Value>;

/// Variables visible to the template resolver for one iteration.
pub type VarMap = serde_json::Map<String, Value>;

/// The live variable set of one named environment for the length of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    name: String,
    values: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Merges the stable `vars` layer with the `secrets` layer; secrets win.
    #[must_use]
    pub fn from_layers(
        name: impl Into<String>,
        vars: &BTreeMap<String, String>,
        secrets: &BTreeMap<String, String>,
    ) -> Self {
        let mut values = vars.clone();
        for (key, value) in secrets {
            values.insert(key.clone(), value.clone());
        }
        values.retain(|key, _| !key.is_empty());
        Self {
            name: name.into(),
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Commits a delta in place. `None` entries delete the variable.
    pub fn apply(&mut self, delta: &EnvironmentDelta) {
        for (key, change) in delta.iter() {
            match change {
                Some(value) => {
                    self.values.insert(key.to_owned(), value.to_owned());
                }
                None => {
                    self.values.remove(key);
                }
            }
        }
    }

    /// Environment values overlaid with the row values; the row wins.
    #[must_use]
    pub fn merged_with(&self, row: &RowVars) -> VarMap {
        let mut merged: VarMap = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        for (key, value) in row {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Pending set/unset operations produced by one script run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentDelta(BTreeMap<String, Option<String>>);

impl EnvironmentDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    pub fn unset(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), None);
    }

    /// `Some(None)` means the key was unset by this delta.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

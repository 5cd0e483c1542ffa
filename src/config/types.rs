use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::args::parse_duration_arg;
use crate::domain::{EnvironmentSnapshot, RequestDraft};
use crate::error::ValidationError;

/// Environment used when neither the CLI nor the settings name one.
pub const DEFAULT_ENVIRONMENT: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionFile {
    pub settings: Settings,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub requests: Vec<RequestDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_environment: Option<String>,
    pub script_timeout: Option<DurationValue>,
    pub request_timeout: Option<DurationValue>,
    pub proxy_url: Option<String>,
    pub agent_url: Option<String>,
    pub agent_token: Option<String>,
}

/// Either milliseconds or a string with a unit (`"1500ms"`, `"2s"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Millis(u64),
    Text(String),
}

impl DurationValue {
    /// # Errors
    ///
    /// Returns an error for zero or malformed durations.
    pub fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Millis(0) => Err(ValidationError::DurationZero),
            DurationValue::Millis(ms) => Ok(Duration::from_millis(*ms)),
            DurationValue::Text(text) => parse_duration_arg(text),
        }
    }
}

/// Two layers of one named environment; `secrets` override `vars`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    #[serde(deserialize_with = "scalar_map")]
    pub vars: BTreeMap<String, String>,
    #[serde(deserialize_with = "scalar_map")]
    pub secrets: BTreeMap<String, String>,
}

/// Environment values are strings; numbers and booleans are accepted and
/// stored as their text, nulls are dropped.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((key, text)),
            Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                Some((key, value.to_string()))
            }
        })
        .collect())
}

impl CollectionFile {
    /// Builds the snapshot for `name`, falling back to the configured
    /// default, then to `default`, then to the only environment defined.
    /// Without any environments the snapshot is empty.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicitly named environment does not exist.
    pub fn environment(&self, name: Option<&str>) -> Result<EnvironmentSnapshot, ValidationError> {
        let explicit = name.or(self.settings.default_environment.as_deref());
        if let Some(name) = explicit {
            let config = self.environments.get(name).ok_or_else(|| {
                ValidationError::UnknownEnvironment {
                    name: name.to_owned(),
                }
            })?;
            return Ok(EnvironmentSnapshot::from_layers(
                name,
                &config.vars,
                &config.secrets,
            ));
        }

        let fallback = self
            .environments
            .get_key_value(DEFAULT_ENVIRONMENT)
            .or_else(|| {
                if self.environments.len() == 1 {
                    self.environments.iter().next()
                } else {
                    None
                }
            });
        Ok(match fallback {
            Some((name, config)) => {
                EnvironmentSnapshot::from_layers(name.as_str(), &config.vars, &config.secrets)
            }
            None => EnvironmentSnapshot::new(DEFAULT_ENVIRONMENT),
        })
    }

    /// Requests to run, in file order. An empty filter selects all.
    ///
    /// # Errors
    ///
    /// Returns an error for a filter that names no request, or an empty
    /// collection.
    pub fn select_requests(&self, names: &[String]) -> Result<Vec<RequestDraft>, ValidationError> {
        if self.requests.is_empty() {
            return Err(ValidationError::NoRequests);
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.requests.iter().any(|request| &request.name == *name))
        {
            return Err(ValidationError::UnknownRequest {
                name: unknown.clone(),
            });
        }
        Ok(self
            .requests
            .iter()
            .filter(|request| names.is_empty() || names.contains(&request.name))
            .cloned()
            .collect())
    }
}

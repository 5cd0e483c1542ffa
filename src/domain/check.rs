use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ConfigError;

/// A declarative assertion attached to a request.
///
/// Definitions deserialize from `{ "type": "...", "enabled": bool, ... }`.
/// An unrecognized `type` becomes [`Check::Unknown`] instead of failing the
/// whole collection; a recognized type with bad fields is a config error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct TestDefinition {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub check: Check,
}

impl TestDefinition {
    #[must_use]
    pub const fn new(check: Check) -> Self {
        Self {
            enabled: true,
            name: None,
            check,
        }
    }

    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl TryFrom<Value> for TestDefinition {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = &value else {
            return Err(ConfigError::TestDefinitionMissingType);
        };
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ConfigError::TestDefinitionMissingType)?
            .to_owned();
        let enabled = fields.get("enabled").and_then(Value::as_bool).unwrap_or(true);
        let name = fields.get("name").and_then(Value::as_str).map(str::to_owned);

        let check = if Check::KINDS.contains(&kind.as_str()) {
            serde_json::from_value(value)
                .map_err(|source| ConfigError::InvalidTestDefinition { source })?
        } else {
            Check::Unknown { kind }
        };

        Ok(Self {
            enabled,
            name,
            check,
        })
    }
}

/// Serializes back to the definition it was read from; an unknown kind keeps
/// its original `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", tag = "type", rename_all = "snake_case")]
pub enum Check {
    StatusEquals { expected: u16 },
    /// Textual status set: `200`, `200,201,204` or `200-299`.
    StatusRange { expected: String },
    StatusOneOf { expected: Vec<u16> },
    HeaderExists { header: String },
    HeaderEquals { header: String, expected: String },
    HeaderContains { header: String, expected: String },
    JsonExists { path: String },
    JsonEquals { path: String, expected: Value },
    JsonContains { path: String, expected: Value },
    JsonType { path: String, expected: JsonKind },
    JsonNotEmpty { path: String },
    RequiredFields { fields: Vec<String> },
    ResponseTimeBelow { max_ms: u64 },
    BodyContains { expected: String },
    Unknown { kind: String },
}

impl Serialize for Check {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Check::Unknown { kind } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", kind)?;
                map.end()
            }
            known => Check::serialize(known, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Check {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Check::deserialize(deserializer)
    }
}

impl Check {
    /// Tags accepted from collection files.
    pub const KINDS: [&'static str; 14] = [
        "status_equals",
        "status_range",
        "status_one_of",
        "header_exists",
        "header_equals",
        "header_contains",
        "json_exists",
        "json_equals",
        "json_contains",
        "json_type",
        "json_not_empty",
        "required_fields",
        "response_time_below",
        "body_contains",
    ];

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Check::StatusEquals { expected } => format!("status is {}", expected),
            Check::StatusRange { expected } => format!("status in {}", expected),
            Check::StatusOneOf { expected } => format!("status one of {:?}", expected),
            Check::HeaderExists { header } => format!("header {} exists", header),
            Check::HeaderEquals { header, expected } => {
                format!("header {} equals {}", header, expected)
            }
            Check::HeaderContains { header, expected } => {
                format!("header {} contains {}", header, expected)
            }
            Check::JsonExists { path } => format!("{} exists", path),
            Check::JsonEquals { path, expected } => format!("{} equals {}", path, expected),
            Check::JsonContains { path, expected } => format!("{} contains {}", path, expected),
            Check::JsonType { path, expected } => format!("{} is {}", path, expected),
            Check::JsonNotEmpty { path } => format!("{} is not empty", path),
            Check::RequiredFields { fields } => format!("required fields {}", fields.join(", ")),
            Check::ResponseTimeBelow { max_ms } => format!("response time below {}ms", max_ms),
            Check::BodyContains { expected } => format!("body contains {}", expected),
            Check::Unknown { kind } => format!("unknown test type {}", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonKind {
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => JsonKind::String,
            Value::Number(_) => JsonKind::Number,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Object(_) => JsonKind::Object,
            Value::Array(_) => JsonKind::Array,
            Value::Null => JsonKind::Null,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::Null => "null",
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

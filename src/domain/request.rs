use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::check::TestDefinition;
use super::environment::RowVars;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET and HEAD requests never carry a body.
    #[must_use]
    pub const fn allows_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(ValidationError::InvalidMethod {
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(value: HttpMethod) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl KeyValue {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RequestBody {
    #[default]
    None,
    Raw {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    /// Either a structured JSON value or JSON text (a JSON string) that is
    /// parsed after template resolution.
    Json { json: Value },
    Form { fields: Vec<KeyValue> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyPlacement {
    #[default]
    Header,
    Query,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Auth {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    ApiKey {
        key: String,
        value: String,
        #[serde(default)]
        placement: ApiKeyPlacement,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Direct,
    Proxy,
    Agent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDraft {
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<KeyValue>,
    pub headers: Vec<KeyValue>,
    pub body: RequestBody,
    pub auth: Auth,
    pub tests: Vec<TestDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_response_script: Option<String>,
    pub mode: ExecutionMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<RowVars>,
}

impl RequestDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Label used in logs and reports.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }

    /// Checks that can run before any variables are known.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty URL, or a JSON text body without
    /// template tokens that fails to parse on a method that sends a body.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl {
                request: self.label().to_owned(),
            });
        }
        if let RequestBody::Json {
            json: Value::String(text),
        } = &self.body
            && self.method.allows_body()
            && !text.contains("{{")
            && !text.trim().is_empty()
        {
            serde_json::from_str::<Value>(text).map_err(|source| {
                ValidationError::InvalidJsonBody {
                    request: self.label().to_owned(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Builds a new draft with a pre-request script override applied. The
    /// original draft is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the override leaves the URL empty or names an
    /// unknown method.
    pub fn with_override(&self, change: &RequestOverride) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(url) = change.url.as_ref() {
            next.url.clone_from(url);
        }
        if let Some(method) = change.method.as_deref() {
            next.method = method.parse()?;
        }
        for name in &change.removed_headers {
            next.headers
                .retain(|header| !header.key.eq_ignore_ascii_case(name));
        }
        for (name, value) in &change.headers {
            match next
                .headers
                .iter_mut()
                .find(|header| header.key.eq_ignore_ascii_case(name))
            {
                Some(existing) => {
                    existing.value.clone_from(value);
                    existing.enabled = true;
                }
                None => next.headers.push(KeyValue::new(name.clone(), value.clone())),
            }
        }
        for (key, value) in &change.query {
            next.params.push(KeyValue::new(key.clone(), value.clone()));
        }
        if let Some(body) = change.body.as_ref() {
            next.body = match &self.body {
                RequestBody::Json { .. } => RequestBody::Json {
                    json: Value::String(body.clone()),
                },
                RequestBody::Raw { content_type, .. } => RequestBody::Raw {
                    content: body.clone(),
                    content_type: content_type.clone(),
                },
                RequestBody::None | RequestBody::Form { .. } => RequestBody::Raw {
                    content: body.clone(),
                    content_type: None,
                },
            };
        }
        if next.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl {
                request: next.label().to_owned(),
            });
        }
        Ok(next)
    }
}

/// Request changes recorded by a pre-request script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_headers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestOverride {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.method.is_none()
            && self.headers.is_empty()
            && self.removed_headers.is_empty()
            && self.query.is_empty()
            && self.body.is_none()
    }
}

use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{ApiKeyPlacement, Auth, HttpMethod, RequestBody, RequestDraft};
use crate::error::ValidationError;

/// A fully resolved request, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PreparedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    fn default_header(&mut self, name: &str, value: String) {
        if !self.has_header(name) {
            self.headers.push((name.to_owned(), value));
        }
    }
}

/// Turns a resolved draft into a wire request: query params are appended to
/// the URL, auth becomes headers or query params, and the body is encoded.
/// GET and HEAD never carry a body.
///
/// # Errors
///
/// Returns an error for an empty or unparseable URL, or a JSON text body
/// that does not parse after resolution.
pub fn prepare_request(draft: &RequestDraft) -> Result<PreparedRequest, ValidationError> {
    let raw_url = draft.url.trim();
    if raw_url.is_empty() {
        return Err(ValidationError::EmptyUrl {
            request: draft.label().to_owned(),
        });
    }
    let mut url = url::Url::parse(raw_url).map_err(|source| ValidationError::InvalidUrl {
        request: draft.label().to_owned(),
        url: raw_url.to_owned(),
        source,
    })?;

    let mut query: Vec<(&str, &str)> = draft
        .params
        .iter()
        .filter(|param| param.enabled && !param.key.trim().is_empty())
        .map(|param| (param.key.trim(), param.value.as_str()))
        .collect();
    if let Auth::ApiKey {
        key,
        value,
        placement: ApiKeyPlacement::Query,
    } = &draft.auth
        && !key.trim().is_empty()
    {
        query.push((key.trim(), value.as_str()));
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let mut request = PreparedRequest {
        method: draft.method,
        url: url.to_string(),
        headers: draft
            .headers
            .iter()
            .filter(|header| header.enabled && !header.key.trim().is_empty())
            .map(|header| (header.key.trim().to_owned(), header.value.clone()))
            .collect(),
        body: None,
    };

    match &draft.auth {
        Auth::None => {}
        Auth::Bearer { token } => {
            if !token.is_empty() {
                request.default_header("Authorization", format!("Bearer {}", token));
            }
        }
        Auth::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password).as_bytes());
            request.default_header("Authorization", format!("Basic {}", encoded));
        }
        Auth::ApiKey {
            key,
            value,
            placement: ApiKeyPlacement::Header,
        } => {
            if !key.trim().is_empty() {
                request.default_header(key.trim(), value.clone());
            }
        }
        Auth::ApiKey {
            placement: ApiKeyPlacement::Query,
            ..
        } => {}
    }

    if draft.method.allows_body() {
        encode_body(draft, &mut request)?;
    }
    Ok(request)
}

fn encode_body(draft: &RequestDraft, request: &mut PreparedRequest) -> Result<(), ValidationError> {
    match &draft.body {
        RequestBody::None => {}
        RequestBody::Raw {
            content,
            content_type,
        } => {
            if let Some(content_type) = content_type.as_ref().filter(|value| !value.is_empty()) {
                request.default_header("Content-Type", content_type.clone());
            }
            request.body = Some(content.clone());
        }
        RequestBody::Json { json } => {
            let text = match json {
                Value::String(text) if text.trim().is_empty() => return Ok(()),
                Value::String(text) => {
                    serde_json::from_str::<Value>(text).map_err(|source| {
                        ValidationError::InvalidJsonBody {
                            request: draft.label().to_owned(),
                            source,
                        }
                    })?;
                    text.clone()
                }
                Value::Null => return Ok(()),
                Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                    json.to_string()
                }
            };
            request.default_header("Content-Type", "application/json".to_owned());
            request.body = Some(text);
        }
        RequestBody::Form { fields } => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(
                    fields
                        .iter()
                        .filter(|field| field.enabled && !field.key.trim().is_empty())
                        .map(|field| (field.key.trim(), field.value.as_str())),
                )
                .finish();
            request.default_header(
                "Content-Type",
                "application/x-www-form-urlencoded".to_owned(),
            );
            request.body = Some(encoded);
        }
    }
    Ok(())
}

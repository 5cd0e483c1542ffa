use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::response::canonical_reason;
use super::{HttpResponse, PreparedRequest, Transport};
use crate::error::TransportError;

/// Relays requests through a local HTTP proxy that speaks a small JSON
/// envelope: `{url, method, headers, body}` in, `{status, statusText,
/// headers, body}` out.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    client: Client,
    endpoint: String,
}

impl ProxyTransport {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            client: relay_client(request_timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProxyReply {
    pub status: u16,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub headers: Value,
    #[serde(default)]
    pub body: Value,
}

impl From<ProxyReply> for HttpResponse {
    fn from(reply: ProxyReply) -> Self {
        HttpResponse {
            status: reply.status,
            status_text: reply
                .status_text
                .unwrap_or_else(|| canonical_reason(reply.status).to_owned()),
            headers: header_pairs(&reply.headers),
            raw_text: body_text(reply.body),
        }
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let text = post_relay(&self.client, &self.endpoint, None, &relay_payload(request)).await?;
        let reply: ProxyReply = serde_json::from_str(&text)
            .map_err(|source| TransportError::RelayPayload { source })?;
        Ok(reply.into())
    }
}

pub(super) fn relay_client(request_timeout: Duration) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|source| TransportError::BuildClientFailed { source })
}

pub(super) fn relay_payload(request: &PreparedRequest) -> Value {
    let headers: Map<String, Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    serde_json::json!({
        "url": request.url,
        "method": request.method.as_str(),
        "headers": headers,
        "body": request.body,
    })
}

pub(super) async fn post_relay(
    client: &Client,
    endpoint: &str,
    bearer: Option<&str>,
    payload: &Value,
) -> Result<String, TransportError> {
    let mut builder = client.post(endpoint).json(payload);
    if let Some(token) = bearer {
        builder = builder.bearer_auth(token);
    }
    let response = builder
        .send()
        .await
        .map_err(|source| TransportError::RequestFailed { source })?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::RelayStatus {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|source| TransportError::ReadBody { source })
}

/// Accepts relay headers as an object (`{"a": "1"}`, array values joined
/// with `, `) or as a list of `[name, value]` pairs.
pub(super) fn header_pairs(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(name, value)| (name.clone(), header_value(value)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item.as_array()?.as_slice() {
                [name, value] => Some((name.as_str()?.to_owned(), header_value(value))),
                _ => None,
            })
            .collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Vec::new(),
    }
}

fn header_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(header_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
    }
}

pub(super) fn body_text(body: Value) -> String {
    match body {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => body.to_string(),
    }
}

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::proxy::{body_text, header_pairs, post_relay, relay_client, relay_payload};
use super::response::canonical_reason;
use super::{HttpResponse, PreparedRequest, Transport};
use crate::error::TransportError;

/// Relays requests through a paired local agent, authenticated with a
/// bearer token. The agent wraps its result in `{ok, result, error}`.
#[derive(Clone)]
pub struct AgentTransport {
    client: Client,
    endpoint: String,
    token: String,
}

impl AgentTransport {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: relay_client(request_timeout)?,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

impl std::fmt::Debug for AgentTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct AgentEnvelope {
    ok: bool,
    #[serde(default)]
    result: Option<AgentResult>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentResult {
    status: u16,
    #[serde(default)]
    status_text: Option<String>,
    #[serde(default)]
    headers: Value,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    is_base64: bool,
}

#[async_trait]
impl Transport for AgentTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let text = post_relay(
            &self.client,
            &self.endpoint,
            Some(&self.token),
            &relay_payload(request),
        )
        .await?;
        decode_agent_reply(&text)
    }
}

pub(super) fn decode_agent_reply(text: &str) -> Result<HttpResponse, TransportError> {
    let envelope: AgentEnvelope =
        serde_json::from_str(text).map_err(|source| TransportError::RelayPayload { source })?;
    let result = match envelope {
        AgentEnvelope {
            ok: true,
            result: Some(result),
            ..
        } => result,
        AgentEnvelope { error, .. } => {
            let message = match error {
                Some(Value::String(message)) => message,
                Some(Value::Object(fields)) => fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| Value::Object(fields.clone()).to_string(), str::to_owned),
                Some(other) => other.to_string(),
                None => "agent returned no result".to_owned(),
            };
            return Err(TransportError::RelayFailed { message });
        }
    };

    let raw_text = if result.is_base64 {
        let encoded = body_text(result.body);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|source| TransportError::RelayBase64 { source })?;
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        body_text(result.body)
    };

    Ok(HttpResponse {
        status: result.status,
        status_text: result
            .status_text
            .unwrap_or_else(|| canonical_reason(result.status).to_owned()),
        headers: header_pairs(&result.headers),
        raw_text,
    })
}

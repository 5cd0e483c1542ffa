use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderName, HeaderValue};

use super::{HttpResponse, PreparedRequest, Transport};
use crate::domain::HttpMethod;
use crate::error::TransportError;

/// Sends requests straight from this process.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    client: Client,
}

impl DirectTransport {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| TransportError::BuildClientFailed { source })?;
        Ok(Self { client })
    }
}

pub(super) const fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        let url = url::Url::parse(&request.url).map_err(|source| TransportError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;
        let mut builder = self.client.request(reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_err| {
                TransportError::InvalidHeaderName { name: name.clone() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_err| {
                TransportError::InvalidHeaderValue { name: name.clone() }
            })?;
            builder = builder.header(header_name, header_value);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::RequestFailed { source })?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let raw_text = response
            .text()
            .await
            .map_err(|source| TransportError::ReadBody { source })?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_owned(),
            headers,
            raw_text,
        })
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid HTTP method '{method}'.")]
    InvalidMethod { method: String },
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header name '{name}'.")]
    InvalidHeaderName { name: String },
    #[error("Invalid value for header '{name}'.")]
    InvalidHeaderValue { name: String },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Request failed: {source}")]
    RequestFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read response body: {source}")]
    ReadBody {
        #[source]
        source: reqwest::Error,
    },
    #[error("Relay '{endpoint}' responded with status {status}.")]
    RelayStatus { endpoint: String, status: u16 },
    #[error("Relay reported failure: {message}")]
    RelayFailed { message: String },
    #[error("Relay returned an invalid payload: {source}")]
    RelayPayload {
        #[source]
        source: serde_json::Error,
    },
    #[error("Relay returned an invalid base64 body: {source}")]
    RelayBase64 {
        #[source]
        source: base64::DecodeError,
    },
}

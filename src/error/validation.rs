use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Request '{request}' has an empty URL.")]
    EmptyUrl { request: String },
    #[error("Request '{request}' has a JSON body that does not parse: {source}")]
    InvalidJsonBody {
        request: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Request '{request}' has an invalid URL '{url}': {source}")]
    InvalidUrl {
        request: String,
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid HTTP method '{value}'.")]
    InvalidMethod { value: String },
    #[error("Unknown environment '{name}'.")]
    UnknownEnvironment { name: String },
    #[error("No request named '{name}' in the collection.")]
    UnknownRequest { name: String },
    #[error("Collection does not contain any requests.")]
    NoRequests,
    #[error("Request '{request}' uses proxy mode but settings.proxy_url is not set.")]
    ProxyNotConfigured { request: String },
    #[error("Request '{request}' uses agent mode but settings.agent_url is not set.")]
    AgentNotConfigured { request: String },
    #[error("Invalid header format: '{value}'. Expected 'Key: Value'")]
    InvalidHeaderFormat { value: String },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("{failed} of {total} iteration(s) failed.")]
    RunFailed { failed: usize, total: usize },
    #[error("Run was cancelled.")]
    Cancelled,
}

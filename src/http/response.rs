use serde::{Deserialize, Serialize};

/// The one response shape every transport normalizes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub raw_text: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, raw_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_owned(),
            headers: Vec::new(),
            raw_text: raw_text.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Reason phrase for a status code, empty when unknown.
#[must_use]
pub fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

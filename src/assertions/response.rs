use serde_json::Value;

use crate::http::HttpResponse;

/// What the assertion engine sees of a completed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseView {
    pub status: u16,
    pub elapsed_ms: u64,
    pub json: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseView {
    #[must_use]
    pub fn from_response(response: &HttpResponse, elapsed_ms: u64) -> Self {
        Self {
            status: response.status,
            elapsed_ms,
            json: serde_json::from_str(&response.raw_text).ok(),
            headers: response.headers.clone(),
            body: response.raw_text.clone(),
        }
    }

    /// Case-insensitive header lookup; repeated headers are joined with `, `.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
            .map(|(_, value)| value.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }
}

//! Time-bounded execution of user scripts against the `pm` API.
//!
//! Scripts are written in Rhai. Every run gets its own OS thread and its own
//! engine; the job is moved in and the outcome comes back over a channel, so
//! a runaway script can only ever cost its own timeout.
mod api;
mod expect;
mod sandbox;
mod state;


use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    EnvironmentDelta, RequestBody, RequestDraft, RequestOverride, RowVars, TestReport, TestResult,
};
use crate::http::{HttpResponse, PreparedRequest};

pub use sandbox::{run_script, run_script_blocking};

pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptRole {
    PreRequest,
    PostResponse,
}

impl ScriptRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScriptRole::PreRequest => "pre-request",
            ScriptRole::PostResponse => "post-response",
        }
    }
}

impl std::fmt::Display for ScriptRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a script sees of the request (`pm.request`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestSnapshot {
    /// Snapshot of a draft before it is resolved; used for pre-request runs.
    #[must_use]
    pub fn from_draft(draft: &RequestDraft) -> Self {
        let body = match &draft.body {
            RequestBody::None => None,
            RequestBody::Raw { content, .. } => Some(content.clone()),
            RequestBody::Json {
                json: Value::String(text),
            } => Some(text.clone()),
            RequestBody::Json { json } => Some(json.to_string()),
            RequestBody::Form { fields } => Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(
                        fields
                            .iter()
                            .filter(|field| field.enabled)
                            .map(|field| (field.key.as_str(), field.value.as_str())),
                    )
                    .finish(),
            ),
        };
        Self {
            url: draft.url.clone(),
            method: draft.method.as_str().to_owned(),
            headers: draft
                .headers
                .iter()
                .filter(|header| header.enabled)
                .map(|header| (header.key.clone(), header.value.clone()))
                .collect(),
            body,
        }
    }

    /// Snapshot of the request that was actually sent.
    #[must_use]
    pub fn from_prepared(request: &PreparedRequest) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.as_str().to_owned(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }
}

/// The response handed to a post-response script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResponse {
    pub response: HttpResponse,
    pub elapsed_ms: u64,
}

/// Values exposed as `pm.info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub iteration: usize,
    pub request_name: String,
}

/// Everything one script run needs; moved onto the sandbox thread whole.
#[derive(Debug, Clone)]
pub struct ScriptJob {
    pub role: ScriptRole,
    pub source: String,
    pub request: RequestSnapshot,
    pub response: Option<ScriptResponse>,
    pub environment: BTreeMap<String, String>,
    pub row: RowVars,
    pub info: ScriptInfo,
    pub timeout: Duration,
}

impl ScriptJob {
    #[must_use]
    pub fn new(role: ScriptRole, source: impl Into<String>) -> Self {
        Self {
            role,
            source: source.into(),
            request: RequestSnapshot::default(),
            response: None,
            environment: BTreeMap::new(),
            row: RowVars::new(),
            info: ScriptInfo::default(),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
    Print,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Print => "print",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLog {
    pub level: LogLevel,
    pub message: String,
    /// Unix epoch milliseconds.
    pub ts_ms: i64,
}

impl ScriptLog {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            ts_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Result of one script run. Script failures are data here, never errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutcome {
    pub ok: bool,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<TestResult>,
    pub logs: Vec<ScriptLog>,
    pub environment_delta: EnvironmentDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_override: Option<RequestOverride>,
    pub duration_ms: u64,
}

impl ScriptOutcome {
    #[must_use]
    pub fn failed(error: &crate::error::ScriptError, timed_out: bool, duration_ms: u64) -> Self {
        Self {
            ok: false,
            timed_out,
            error: Some(error.to_string()),
            duration_ms,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn report(&self) -> TestReport {
        let mut report = TestReport::default();
        for result in &self.results {
            report.push(result.clone());
        }
        report
    }
}

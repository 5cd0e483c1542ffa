use serde::{Serialize, Serializer};

use crate::domain::TestReport;
use crate::trace::TraceId;

/// Status column of an iteration: the HTTP status of a completed round trip,
/// or `ERR` when none happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationStatus {
    Code(u16),
    Failed,
}

impl IterationStatus {
    #[must_use]
    pub const fn code(self) -> Option<u16> {
        match self {
            IterationStatus::Code(code) => Some(code),
            IterationStatus::Failed => None,
        }
    }
}

impl std::fmt::Display for IterationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IterationStatus::Code(code) => write!(f, "{}", code),
            IterationStatus::Failed => f.write_str("ERR"),
        }
    }
}

impl Serialize for IterationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IterationStatus::Code(code) => serializer.serialize_u16(*code),
            IterationStatus::Failed => serializer.serialize_str("ERR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationErrorKind {
    /// The request could not be built (bad override, bad URL, bad body).
    Validation,
    /// A script threw, failed to compile or left tests unsettled.
    Script,
    /// A script ran past its deadline.
    Timeout,
    Transport,
    Aborted,
}

impl IterationErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            IterationErrorKind::Validation => "validation",
            IterationErrorKind::Script => "script",
            IterationErrorKind::Timeout => "timeout",
            IterationErrorKind::Transport => "transport",
            IterationErrorKind::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationError {
    pub kind: IterationErrorKind,
    pub message: String,
}

impl IterationError {
    #[must_use]
    pub fn new(kind: IterationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationResult {
    pub request: String,
    /// Zero-based row index within the request.
    pub iteration: usize,
    pub trace_id: TraceId,
    pub ok: bool,
    pub status: IterationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Time spent in the transport call.
    pub elapsed_ms: u64,
    pub tests: TestReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IterationError>,
    /// Template names that were referenced but had no value.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_vars: Vec<String>,
}

impl IterationResult {
    #[must_use]
    pub fn failed(request: &str, iteration: usize, trace_id: TraceId, error: IterationError) -> Self {
        Self {
            request: request.to_owned(),
            iteration,
            trace_id,
            ok: false,
            status: IterationStatus::Failed,
            status_text: None,
            url: None,
            elapsed_ms: 0,
            tests: TestReport::default(),
            error: Some(error),
            missing_vars: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub iterations: Vec<IterationResult>,
    /// Set when the abort signal stopped the batch early.
    pub aborted: bool,
    pub duration_ms: u64,
}

impl BatchReport {
    #[must_use]
    pub fn failed_iterations(&self) -> usize {
        self.iterations.iter().filter(|result| !result.ok).count()
    }

    #[must_use]
    pub fn tests(&self) -> TestReport {
        let mut report = TestReport::default();
        for iteration in &self.iterations {
            report.extend(iteration.tests.clone());
        }
        report
    }

    /// Every iteration completed and every test passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.aborted
            && self
                .iterations
                .iter()
                .all(|result| result.ok && result.tests.all_passed())
    }
}

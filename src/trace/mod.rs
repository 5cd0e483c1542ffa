//! Lifecycle events emitted by the runner and the helpers that put them back
//! together per iteration.
mod correlate;
mod export;
mod sink;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use correlate::{TraceGroup, correlate};
pub use export::{parse_jsonl, write_jsonl};
pub use sink::{LogSink, MemorySink, TraceSink};

/// Correlation key shared by every event of one iteration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TraceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Request,
    /// A log line written by a pre-request script.
    Prerequest,
    Response,
    Error,
    /// A log line written by a post-response script.
    ScriptLog,
}

impl EventKind {
    /// Tie-breaker inside one sequence number.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            EventKind::Request => 0,
            EventKind::Prerequest => 1,
            EventKind::Response | EventKind::Error => 2,
            EventKind::ScriptLog => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub trace_id: TraceId,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub seq: u64,
    /// RFC 3339 wall-clock time; informational only, `seq` orders events.
    pub ts: String,
    pub data: Value,
}

impl TraceEvent {
    #[must_use]
    pub fn new(trace_id: TraceId, kind: EventKind, seq: u64, data: Value) -> Self {
        Self {
            trace_id,
            kind,
            seq,
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            data,
        }
    }
}

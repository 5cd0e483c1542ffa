use serde_json::{Value, json};

use crate::script::ScriptLog;
use crate::trace::{EventKind, TraceEvent, TraceId, TraceSink};

/// Hands out batch-wide sequence numbers and forwards events to the sink.
pub(super) struct Emitter<'sink> {
    sink: &'sink mut dyn TraceSink,
    seq: u64,
}

impl<'sink> Emitter<'sink> {
    pub fn new(sink: &'sink mut dyn TraceSink) -> Self {
        Self { sink, seq: 0 }
    }

    fn emit(&mut self, trace_id: &TraceId, kind: EventKind, data: Value) {
        self.seq = self.seq.saturating_add(1);
        self.sink
            .emit(TraceEvent::new(trace_id.clone(), kind, self.seq, data));
    }

    /// Flushes one iteration's events in their fixed order.
    pub fn flush(&mut self, events: IterationEvents) {
        let IterationEvents {
            trace_id,
            request,
            pre_request_logs,
            outcome,
            post_response_logs,
        } = events;
        self.emit(&trace_id, EventKind::Request, request);
        for log in &pre_request_logs {
            self.emit(&trace_id, EventKind::Prerequest, log_data(log));
        }
        if let Some((kind, data)) = outcome {
            self.emit(&trace_id, kind, data);
        }
        for log in &post_response_logs {
            self.emit(&trace_id, EventKind::ScriptLog, log_data(log));
        }
    }
}

fn log_data(log: &ScriptLog) -> Value {
    json!({
        "level": log.level.as_str(),
        "message": log.message,
        "tsMs": log.ts_ms,
    })
}

/// Events collected while an iteration runs; emitted together at its end.
pub(super) struct IterationEvents {
    pub trace_id: TraceId,
    pub request: Value,
    pub pre_request_logs: Vec<ScriptLog>,
    pub outcome: Option<(EventKind, Value)>,
    pub post_response_logs: Vec<ScriptLog>,
}

impl IterationEvents {
    pub fn new(trace_id: TraceId, request: Value) -> Self {
        Self {
            trace_id,
            request,
            pre_request_logs: Vec::new(),
            outcome: None,
            post_response_logs: Vec::new(),
        }
    }

    pub fn error(&mut self, kind: &str, message: &str) {
        self.outcome = Some((
            EventKind::Error,
            json!({ "kind": kind, "message": message }),
        ));
    }
}

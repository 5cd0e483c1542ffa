use tracing::debug;

use super::TraceEvent;

/// Receives trace events as the runner produces them.
pub trait TraceSink: Send {
    fn emit(&mut self, event: TraceEvent);
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<TraceEvent>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl TraceSink for MemorySink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Writes events to the `tracing` log at debug level and forwards them.
#[derive(Debug)]
pub struct LogSink<S> {
    inner: S,
}

impl<S> LogSink<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TraceSink> TraceSink for LogSink<S> {
    fn emit(&mut self, event: TraceEvent) {
        debug!(
            trace_id = %event.trace_id,
            seq = event.seq,
            kind = ?event.kind,
            "trace event"
        );
        self.inner.emit(event);
    }
}

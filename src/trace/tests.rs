use super::*;
use serde_json::json;
use std::future::Future;

fn event(trace: &str, kind: EventKind, seq: u64) -> TraceEvent {
    let mut event = TraceEvent::new(TraceId::from(trace), kind, seq, json!({}));
    event.ts = "2026-01-01T00:00:00.000Z".to_owned();
    event
}

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

#[test]
fn trace_ids_are_sixteen_hex_digits() -> Result<(), String> {
    let id = TraceId::generate();
    if id.as_str().len() != 16 || !id.as_str().chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("Unexpected trace id {}", id));
    }
    Ok(())
}

#[test]
fn wire_shape_uses_type_and_camel_case() -> Result<(), String> {
    let value = serde_json::to_value(event("abc", EventKind::ScriptLog, 4))
        .map_err(|err| format!("{}", err))?;
    let expected = json!({
        "traceId": "abc",
        "type": "script-log",
        "seq": 4,
        "ts": "2026-01-01T00:00:00.000Z",
        "data": {}
    });
    if value != expected {
        return Err(format!("Unexpected wire shape {}", value));
    }
    Ok(())
}

#[test]
fn correlate_groups_by_trace_and_orders_by_seq_then_weight() -> Result<(), String> {
    let events = vec![
        event("b", EventKind::Response, 5),
        event("a", EventKind::ScriptLog, 3),
        event("a", EventKind::Response, 3),
        event("a", EventKind::Prerequest, 2),
        event("b", EventKind::Request, 4),
        event("a", EventKind::Request, 1),
    ];
    let groups = correlate(&events);
    let summary: Vec<(&str, Vec<EventKind>)> = groups
        .iter()
        .map(|group| {
            (
                group.trace_id.as_str(),
                group.events.iter().map(|event| event.kind).collect(),
            )
        })
        .collect();
    let expected = vec![
        ("b", vec![EventKind::Request, EventKind::Response]),
        (
            "a",
            vec![
                EventKind::Request,
                EventKind::Prerequest,
                EventKind::Response,
                EventKind::ScriptLog,
            ],
        ),
    ];
    if summary != expected {
        return Err(format!("Unexpected grouping {:?}", summary));
    }
    Ok(())
}

#[test]
fn weight_breaks_ties_when_sequence_collides() -> Result<(), String> {
    let events = vec![
        event("a", EventKind::Error, 7),
        event("a", EventKind::Request, 7),
    ];
    let groups = correlate(&events);
    let kinds: Vec<EventKind> = groups
        .iter()
        .flat_map(|group| group.events.iter().map(|event| event.kind))
        .collect();
    if kinds != vec![EventKind::Request, EventKind::Error] {
        return Err(format!("Unexpected order {:?}", kinds));
    }
    Ok(())
}

#[test]
fn memory_sink_keeps_emission_order() -> Result<(), String> {
    let mut sink = LogSink::new(MemorySink::new());
    sink.emit(event("a", EventKind::Request, 1));
    sink.emit(event("a", EventKind::Response, 2));
    let seqs: Vec<u64> = sink
        .into_inner()
        .events()
        .iter()
        .map(|event| event.seq)
        .collect();
    if seqs != vec![1, 2] {
        return Err(format!("Unexpected events {:?}", seqs));
    }
    Ok(())
}

#[test]
fn jsonl_export_reads_back() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let path = dir.path().join("trace.jsonl");
        let events = vec![
            event("a", EventKind::Request, 1),
            event("a", EventKind::Error, 2),
        ];
        write_jsonl(&path, &events)
            .await
            .map_err(|err| format!("write failed: {}", err))?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| format!("read failed: {}", err))?;
        if text.lines().count() != 2 {
            return Err(format!("Expected two lines, got {:?}", text));
        }
        let parsed = parse_jsonl(&text).map_err(|err| format!("parse failed: {}", err))?;
        if parsed != events {
            return Err(format!("Unexpected events {:?}", parsed));
        }
        Ok(())
    })
}

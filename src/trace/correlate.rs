use std::collections::HashMap;

use super::{TraceEvent, TraceId};

/// Events of one iteration, in causal order.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceGroup {
    pub trace_id: TraceId,
    pub events: Vec<TraceEvent>,
}

/// Groups events by trace id and orders each group by sequence number, then
/// by event kind. Wall-clock timestamps are ignored since they can collide.
/// Groups come back in the order their first event was seen.
#[must_use]
pub fn correlate(events: &[TraceEvent]) -> Vec<TraceGroup> {
    let mut positions: HashMap<&TraceId, usize> = HashMap::new();
    let mut groups: Vec<TraceGroup> = Vec::new();

    for event in events {
        let position = *positions.entry(&event.trace_id).or_insert_with(|| {
            groups.push(TraceGroup {
                trace_id: event.trace_id.clone(),
                events: Vec::new(),
            });
            groups.len().saturating_sub(1)
        });
        if let Some(group) = groups.get_mut(position) {
            group.events.push(event.clone());
        }
    }

    for group in &mut groups {
        group
            .events
            .sort_by_key(|event| (event.seq, event.kind.weight()));
    }
    groups
}

//! Deterministic scheduling-conflict detection.
//!
//! A pure pass over the signal batch: no I/O, no reasoning service. Calendar
//! signals that share an exact instant are flagged; everything else is left
//! to the LLM path.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use foldera_schema::{Conflict, ConflictKind, Severity, SignalKind, WorkSignal};

/// Find calendar signals whose declared instant coincides exactly.
///
/// Signals without a parseable datetime are silently excluded. Each group of
/// two or more at the same instant emits one conflict, severity `High`, with
/// member ids in source order.
pub fn detect_scheduling_conflicts(signals: &[WorkSignal]) -> Vec<Conflict> {
    let mut groups: HashMap<i64, Vec<&str>> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();

    for signal in signals {
        if signal.kind != SignalKind::CalendarEvent {
            continue;
        }
        let Some(instant) = signal.datetime.as_deref().and_then(canonical_instant) else {
            continue;
        };
        let members = groups.entry(instant).or_insert_with(|| {
            order.push(instant);
            Vec::new()
        });
        members.push(signal.id.as_str());
    }

    let mut conflicts = Vec::new();
    for instant in order {
        let members = &groups[&instant];
        if members.len() < 2 {
            continue;
        }
        let rendered = render_instant(instant);
        conflicts.push(Conflict {
            kind: ConflictKind::SchedulingConflict,
            severity: Severity::High,
            signals_involved: members.iter().map(|id| id.to_string()).collect(),
            summary: format!(
                "{} calendar events scheduled at {}",
                members.len(),
                rendered.as_deref().unwrap_or("the same time"),
            ),
            recommended_action: "Reschedule one of the overlapping events".to_string(),
            datetime: rendered,
        });
    }

    conflicts
}

/// Canonical instant for exact-equality grouping: UTC epoch seconds.
/// Offsets normalize, so `09:00:00+01:00` groups with `08:00:00Z`.
fn canonical_instant(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp())
}

fn render_instant(instant: i64) -> Option<String> {
    Utc.timestamp_opt(instant, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

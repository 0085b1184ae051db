//! LLM-assisted conflict solving.
//!
//! The solver always runs the deterministic scheduling pass, then asks the
//! configured reasoning model for semantic conflicts and merges the two. A
//! failed or unusable model response degrades to the deterministic result;
//! callers never see an error for data-quality or availability problems.

use std::collections::HashSet;
use std::sync::Arc;

use foldera_provider::LlmMessage;
use foldera_schema::{Conflict, ConflictKind, Severity, WorkSignal};
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::router::LlmRouter;
use crate::scheduling::detect_scheduling_conflicts;
use crate::ModelPolicy;

const SYSTEM_PROMPT: &str = "You are Foldera's conflict analyst. Examine the work signals provided by the user \
and identify inconsistencies between them: double-booked meetings, contradictory figures \
across documents, commitments that contradict the calendar or each other.\n\
Output a single JSON object {\"conflicts\": [...]} with no surrounding commentary.\n\
Each conflict must have: \"type\" (e.g. scheduling_conflict, content_conflict, \
financial_mismatch, commitment_contradiction), \"severity\" (low|medium|high|critical), \
\"signals_involved\" (array of at least two signal ids taken from the input), \
\"summary\" (one line), \"recommended_action\" (may be empty), and optionally \
\"datetime\" (ISO-8601) for time-bound conflicts.\n\
Only reference signal ids that appear in the input.";

const CONTENT_EXCERPT_CHARS: usize = 240;

pub struct ConflictSolver {
    router: Arc<LlmRouter>,
    model_policy: ModelPolicy,
    max_tokens: u32,
}

impl ConflictSolver {
    pub fn new(router: Arc<LlmRouter>, model_policy: ModelPolicy, max_tokens: u32) -> Self {
        Self {
            router,
            model_policy,
            max_tokens,
        }
    }

    pub fn from_config(router: Arc<LlmRouter>, detection: &DetectionConfig) -> Self {
        Self::new(
            router,
            detection.model_policy.clone(),
            detection.max_tokens,
        )
    }

    /// Detect conflicts in one signal batch.
    ///
    /// Holds no per-call state; concurrent calls over disjoint batches share
    /// only the router behind `Arc`. The result always contains every
    /// deterministic scheduling finding.
    pub async fn detect(&self, signals: &[WorkSignal]) -> Vec<Conflict> {
        if signals.is_empty() {
            return Vec::new();
        }

        let trace_id = Uuid::new_v4();
        let deterministic = detect_scheduling_conflicts(signals);

        let known_ids: HashSet<&str> = signals.iter().map(|s| s.id.as_str()).collect();
        let messages = vec![LlmMessage::user(render_signals(signals))];

        let model_conflicts = match self
            .router
            .chat(
                &self.model_policy.primary,
                &self.model_policy.fallbacks,
                Some(SYSTEM_PROMPT.to_string()),
                messages,
                self.max_tokens,
            )
            .await
        {
            Ok(resp) => parse_conflict_candidates(&resp.text, &known_ids),
            Err(err) => {
                tracing::warn!(
                    "conflict reasoning call failed (trace {trace_id}), \
                     keeping deterministic findings only: {err}"
                );
                Vec::new()
            }
        };

        tracing::debug!(
            "detection trace {trace_id}: {} deterministic, {} model conflicts over {} signals",
            deterministic.len(),
            model_conflicts.len(),
            signals.len()
        );

        merge_conflicts(deterministic, model_conflicts)
    }
}

fn render_signals(signals: &[WorkSignal]) -> String {
    let mut lines = Vec::with_capacity(signals.len() + 1);
    lines.push("Work signals:".to_string());
    for signal in signals {
        let mut excerpt = signal.content.trim().replace('\n', " ");
        if excerpt.len() > CONTENT_EXCERPT_CHARS {
            let cut = (0..=CONTENT_EXCERPT_CHARS)
                .rev()
                .find(|i| excerpt.is_char_boundary(*i))
                .unwrap_or(0);
            excerpt.truncate(cut);
        }
        lines.push(format!(
            "- id={} kind={} source={} datetime={} author={} content=\"{}\"",
            signal.id,
            signal.kind.as_str(),
            signal.source.as_str(),
            signal.datetime.as_deref().unwrap_or("-"),
            signal.author.as_deref().unwrap_or("-"),
            excerpt,
        ));
    }
    lines.join("\n")
}

/// Parse the model's reply into conflicts, dropping anything malformed.
///
/// Accepts `{"conflicts": [...]}` or a bare array, with or without Markdown
/// fences. Items missing required fields or referencing unknown signal ids
/// are dropped individually; a bad item never poisons the batch.
fn parse_conflict_candidates(llm_output: &str, known_ids: &HashSet<&str>) -> Vec<Conflict> {
    let json_str = llm_output
        .trim()
        .strip_prefix("```json")
        .or_else(|| llm_output.trim().strip_prefix("```"))
        .unwrap_or(llm_output.trim());
    let json_str = json_str.strip_suffix("```").unwrap_or(json_str).trim();

    let value: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let items = match &value {
        serde_json::Value::Object(map) => match map.get("conflicts").and_then(|c| c.as_array()) {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        serde_json::Value::Array(items) => items.as_slice(),
        _ => return Vec::new(),
    };

    let mut conflicts = Vec::new();
    for item in items {
        let kind = match item.get("type").and_then(|v| v.as_str()) {
            Some(raw) => ConflictKind::from(raw.to_string()),
            None => continue,
        };

        let severity = item
            .get("severity")
            .and_then(|v| v.as_str())
            .map(Severity::parse_lenient)
            .unwrap_or(Severity::Medium);

        let ids: Vec<String> = match item.get("signals_involved").and_then(|v| v.as_array()) {
            Some(raw) => raw
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            None => continue,
        };
        if ids.len() < 2 {
            continue;
        }
        if ids.iter().any(|id| !known_ids.contains(id.as_str())) {
            continue;
        }

        let summary = match item.get("summary").and_then(|v| v.as_str()) {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => continue,
        };

        let recommended_action = item
            .get("recommended_action")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let datetime = item
            .get("datetime")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        conflicts.push(Conflict {
            kind,
            severity,
            signals_involved: ids,
            summary,
            recommended_action,
            datetime,
        });
    }

    conflicts
}

/// Deterministic findings first, then model findings that are not duplicates
/// under the natural key. The merged list is always a superset of the
/// deterministic one.
fn merge_conflicts(deterministic: Vec<Conflict>, model: Vec<Conflict>) -> Vec<Conflict> {
    let mut seen: HashSet<(Vec<String>, String)> =
        deterministic.iter().map(natural_key).collect();
    let mut merged = deterministic;
    for conflict in model {
        if seen.insert(natural_key(&conflict)) {
            merged.push(conflict);
        }
    }
    merged
}

// The instant is deliberately not part of the key: a given id set and kind
// describe one inconsistency, and models reformat or omit the timestamp
// often enough that string equality on it would leak duplicates.
fn natural_key(conflict: &Conflict) -> (Vec<String>, String) {
    let mut ids = conflict.signals_involved.clone();
    ids.sort();
    (ids, conflict.kind.as_str().to_string())
}

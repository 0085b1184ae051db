//! End-to-end solver tests against a mock Anthropic endpoint: the real HTTP
//! provider, routed through the registry, driven by the solver.

use std::collections::HashMap;
use std::sync::Arc;

use foldera_core::{ConflictSolver, LlmRouter, ModelPolicy};
use foldera_provider::{AnthropicProvider, ProviderRegistry};
use foldera_schema::{ConflictKind, Severity, SignalKind, SignalSource, WorkSignal};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_anthropic_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 200, "output_tokens": 50},
        "stop_reason": "end_turn"
    })
}

fn solver_against(server: &MockServer) -> ConflictSolver {
    let mut registry = ProviderRegistry::new();
    registry.register(
        "anthropic",
        Arc::new(AnthropicProvider::new("test-key", server.uri())),
    );
    let router = Arc::new(LlmRouter::new(registry, HashMap::new(), vec![]));
    ConflictSolver::new(
        router,
        ModelPolicy {
            primary: "anthropic/claude-sonnet-4-5".into(),
            fallbacks: vec![],
        },
        1024,
    )
}

fn batch() -> Vec<WorkSignal> {
    vec![
        WorkSignal::new(
            "gmail:1",
            SignalKind::CalendarEvent,
            SignalSource::Gmail,
            "Board meeting",
        )
        .with_datetime("2024-01-15T09:00:00Z"),
        WorkSignal::new(
            "outlook:2",
            SignalKind::CalendarEvent,
            SignalSource::Outlook,
            "Customer call",
        )
        .with_datetime("2024-01-15T09:00:00Z"),
        WorkSignal::new(
            "drive:doc1",
            SignalKind::DocumentExcerpt,
            SignalSource::Drive,
            "Q1 revenue projection: $2.4M",
        ),
        WorkSignal::new(
            "gmail:mail1",
            SignalKind::Email,
            SignalSource::Gmail,
            "Q1 revenue lands at $1.9M",
        ),
    ]
}

#[tokio::test]
async fn solver_merges_model_conflicts_with_header_verification() {
    let server = MockServer::start().await;

    let reply = r#"{"conflicts": [{
        "type": "financial_mismatch",
        "severity": "critical",
        "signals_involved": ["drive:doc1", "gmail:mail1"],
        "summary": "Projection and email disagree on Q1 revenue",
        "recommended_action": "Confirm the number with finance"
    }]}"#;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_anthropic_response(reply)))
        .expect(1)
        .mount(&server)
        .await;

    let solver = solver_against(&server);
    let conflicts = solver.detect(&batch()).await;

    assert_eq!(conflicts.len(), 2);
    assert_eq!(conflicts[0].kind, ConflictKind::SchedulingConflict);
    assert_eq!(conflicts[0].severity, Severity::High);
    assert_eq!(conflicts[1].kind, ConflictKind::FinancialMismatch);
    assert_eq!(conflicts[1].severity, Severity::Critical);
}

#[tokio::test]
async fn server_error_degrades_to_deterministic_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"type": "api_error", "message": "internal error"}
        })))
        .mount(&server)
        .await;

    let solver = solver_against(&server);
    let conflicts = solver.detect(&batch()).await;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::SchedulingConflict);
    assert_eq!(conflicts[0].signals_involved, vec!["gmail:1", "outlook:2"]);
}

#[tokio::test]
async fn prose_reply_degrades_to_deterministic_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_anthropic_response(
            "I looked at the signals and the two meetings clearly overlap.",
        )))
        .mount(&server)
        .await;

    let solver = solver_against(&server);
    let conflicts = solver.detect(&batch()).await;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::SchedulingConflict);
}

#[tokio::test]
async fn hallucinated_ids_are_dropped_but_valid_items_kept() {
    let server = MockServer::start().await;

    let reply = r#"{"conflicts": [
        {
            "type": "commitment_contradiction",
            "severity": "high",
            "signals_involved": ["gmail:1", "slack:phantom"],
            "summary": "References a signal not in the batch"
        },
        {
            "type": "financial_mismatch",
            "severity": "high",
            "signals_involved": ["drive:doc1", "gmail:mail1"],
            "summary": "Revenue figures disagree"
        }
    ]}"#;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_anthropic_response(reply)))
        .mount(&server)
        .await;

    let solver = solver_against(&server);
    let conflicts = solver.detect(&batch()).await;

    assert_eq!(conflicts.len(), 2);
    assert!(conflicts
        .iter()
        .all(|c| c.kind != ConflictKind::CommitmentContradiction));
}

#[tokio::test]
async fn empty_batch_makes_no_request_at_all() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_anthropic_response("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let solver = solver_against(&server);
    let conflicts = solver.detect(&[]).await;
    assert!(conflicts.is_empty());
}

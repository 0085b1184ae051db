use foldera_provider::{
    custom, AnthropicProvider, LlmProvider, LlmRequest,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_anthropic_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 10, "output_tokens": 5},
        "stop_reason": "end_turn"
    })
}

fn mock_openai_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "message": {"content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5}
    })
}

#[tokio::test]
async fn anthropic_basic_chat_with_header_verification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_anthropic_response(r#"{"conflicts": []}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("test-key", server.uri());
    let resp = provider
        .chat(LlmRequest::simple(
            "claude-sonnet-4-5".into(),
            Some("find conflicts".into()),
            "signals".into(),
        ))
        .await
        .unwrap();

    assert_eq!(resp.text, r#"{"conflicts": []}"#);
    assert_eq!(resp.input_tokens, Some(10));
    assert_eq!(resp.output_tokens, Some(5));
    assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn anthropic_server_error_is_marked_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"type": "api_error", "message": "internal error"}
        })))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("test-key", server.uri());
    let err = provider
        .chat(LlmRequest::simple("m".into(), None, "x".into()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("[retryable]"));
    assert!(err.to_string().contains("internal error"));
}

#[tokio::test]
async fn openai_compat_basic_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_openai_response(r#"{"conflicts": []}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = custom("test-key", server.uri());
    let resp = provider
        .chat(LlmRequest::simple("gpt-4o-mini".into(), None, "signals".into()))
        .await
        .unwrap();

    assert_eq!(resp.text, r#"{"conflicts": []}"#);
    assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn openai_compat_auth_error_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"type": "invalid_api_key", "message": "bad key"}
        })))
        .mount(&server)
        .await;

    let provider = custom("bad-key", server.uri());
    let err = provider
        .chat(LlmRequest::simple("m".into(), None, "x".into()))
        .await
        .unwrap_err();

    assert!(!err.to_string().contains("[retryable]"));
    assert!(err.to_string().contains("bad key"));
}

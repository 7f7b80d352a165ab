//! HTTP-level tests for the OpenAI-compatible provider against a mock server.

use serde_json::json;
use voxloop_core::error::ProviderError;
use voxloop_core::message::Message;
use voxloop_core::provider::{
    Endpoint, FinishReason, ModelOutcome, Provider, ProviderRequest, ToolDefinition,
};
use voxloop_providers::OpenAiCompatProvider;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(server: &MockServer) -> ProviderRequest {
    ProviderRequest {
        endpoint: Endpoint {
            base_url: format!("{}/v1/", server.uri()),
            api_key: "test-key".into(),
        },
        model: "llama3-70b-8192".into(),
        messages: vec![Message::system("be brief"), Message::user("capital of France?")],
        tools: vec![ToolDefinition {
            name: "web_search".into(),
            description: "Search the web".into(),
            parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        }],
    }
}

#[tokio::test]
async fn final_answer_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "llama3-70b-8192"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3-70b-8192",
            "choices": [{"message": {"role": "assistant", "content": "Paris."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new();
    let resp = provider.complete(request(&server)).await.expect("completion");

    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.outcome(), ModelOutcome::Final("Paris.".into()));
    assert_eq!(resp.usage.unwrap().total_tokens, 14);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "be brief");
    assert_eq!(body["messages"][1]["content"], "capital of France?");
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "web_search");
}

#[tokio::test]
async fn tool_calls_are_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3-70b-8192",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "web_search", "arguments": "{\"query\":\"capital of France\"}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let resp = OpenAiCompatProvider::new()
        .complete(request(&server))
        .await
        .expect("completion");

    match resp.outcome() {
        ModelOutcome::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_1");
            assert_eq!(calls[0].name, "web_search");
        }
        other => panic!("expected tool calls, got {other:?}"),
    }
}

#[tokio::test]
async fn error_statuses_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = OpenAiCompatProvider::new();

    let err = provider.complete(request(&server)).await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

    let err = provider.complete(request(&server)).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));

    let err = provider.complete(request(&server)).await.unwrap_err();
    match err {
        ProviderError::ApiError { status_code, message } => {
            assert_eq!(status_code, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let server = MockServer::start().await;
    let mut req = request(&server);
    req.endpoint.base_url = "http://127.0.0.1:1/v1".into();

    let err = OpenAiCompatProvider::new().complete(req).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
}

//! Chat completions endpoint integration tests
//!
//! Tests for POST /v1/chat/completions against a mocked upstream driver
//! endpoint, covering translation, streaming and credential recovery.

use std::sync::Arc;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{chat_body, sse_payloads, FakeSource, TestApp, UnavailableSource};

#[tokio::test]
async fn test_non_streaming_completion() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    Mock::given(method("POST"))
        .and(path("/drivers/call"))
        .and(header("authorization", "Bearer token-1"))
        .and(body_partial_json(json!({
            "interface": "puter-chat-completion",
            "driver": "openai-completion",
            "method": "complete",
            "args": {"model": "gpt-4"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"message": {"role": "assistant", "content": "Hello!"}}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-5.1", false))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "gpt-5.1");
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["choices"][0]["index"], 0);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello!");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(
        body["usage"],
        json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
    );
    assert_eq!(source.acquired(), 1);
}

#[tokio::test]
async fn test_unknown_model_uses_fallback_target() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "driver": "openai-completion",
            "args": {"model": "gpt-4o"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"content": "fallback"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("totally-unknown-model-xyz", false))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["model"], "totally-unknown-model-xyz");
    assert_eq!(body["choices"][0]["message"]["content"], "fallback");
}

#[tokio::test]
async fn test_streaming_completion() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    Mock::given(method("POST"))
        .and(path("/drivers/call"))
        .and(body_partial_json(json!({"args": {"stream": true}})))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "{\"text\":\"Hel\"}\n",
            "{\"heartbeat\":true}\n",
            "{\"text\":\"lo\"}\n",
            "{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"lookup\",\"input\":{\"q\":\"x\"}}\n",
            "{\"message\":{\"content\":\"Hello\"}}\n"
        )))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("claude-opus-4.5", true))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/event-stream");
    assert_eq!(response.header("cache-control"), "no-cache");

    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 5);
    assert_eq!(payloads.last().unwrap(), "[DONE]");

    let chunks: Vec<Value> = payloads[..4]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();

    assert!(chunks.iter().all(|c| c["object"] == "chat.completion.chunk"));
    assert!(chunks.iter().all(|c| c["id"] == chunks[0]["id"]));
    assert_eq!(chunks[0]["choices"][0]["delta"]["content"], "Hel");
    assert_eq!(chunks[0]["choices"][0]["finish_reason"], Value::Null);
    assert_eq!(chunks[1]["choices"][0]["delta"]["content"], "lo");
    assert_eq!(
        chunks[2]["choices"][0]["delta"]["tool_calls"][0]["function"],
        json!({"name": "lookup", "arguments": "{\"q\":\"x\"}"})
    );
    assert_eq!(chunks[3]["choices"][0]["delta"], json!({}));
    assert_eq!(chunks[3]["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_credential_failure_refreshes_and_replays_once() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Forbidden: token invalid"
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"content": "after refresh"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-4o", false))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "after refresh");
    assert_eq!(source.acquired(), 2);
    assert_eq!(source.resets(), 1);
}

#[tokio::test]
async fn test_streaming_credential_failure_is_retried_before_streaming() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "success": false,
            "error": {"delegate": "usage-limited-chat", "message": "usage limit reached"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"text\":\"fresh\"}\n"))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-4o", true))
        .await;

    response.assert_status_ok();
    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 2);
    assert!(payloads[0].contains("\"content\":\"fresh\""));
    assert_eq!(source.resets(), 1);
}

#[tokio::test]
async fn test_replay_failure_is_not_retried_again() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .expect(2)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-4o", false))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "upstream_error");
    assert_eq!(body["error"]["message"], "Forbidden");
    assert_eq!(source.acquired(), 2);
    assert_eq!(source.resets(), 1);
}

#[tokio::test]
async fn test_other_upstream_errors_are_not_retried() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "model not found"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-4o", false))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "model not found");
    assert_eq!(body["error"]["code"], "upstream_error");
    assert_eq!(source.resets(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .text("{\"model\": \"gpt-4o\", \"messages\": [")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_multiple_choices_are_rejected() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    let mut request = chat_body("gpt-4o", false);
    request["n"] = json!(3);

    let response = app.server.post("/v1/chat/completions").json(&request).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(source.acquired(), 0);
}

#[tokio::test]
async fn test_acquisition_failure_is_service_unavailable() {
    let app = TestApp::with_source(Arc::new(UnavailableSource)).await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("gpt-4o", false))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "authentication_error");
    assert_eq!(body["error"]["code"], "acquisition_timeout");
}

#[tokio::test]
async fn test_null_model_and_stream_use_defaults() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    Mock::given(method("POST"))
        .and(path("/drivers/call"))
        .and(body_partial_json(json!({
            "driver": "openai-completion",
            "args": {"model": "gpt-4o"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"content": "defaults"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": null,
            "messages": [{"role": "user", "content": "Hi"}],
            "stream": null
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["choices"][0]["message"]["content"], "defaults");
}

#[tokio::test]
async fn test_unknown_role_is_forwarded_untouched() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "args": {"messages": [
                {"role": "critic", "content": "Be harsh"},
                {"role": "user", "content": "Review this"}
            ]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"content": "reviewed"}
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "critic", "content": "Be harsh"},
                {"role": "user", "content": "Review this"}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "reviewed");
}

#[tokio::test]
async fn test_stream_ending_in_tool_use_still_stops() {
    let app = TestApp::with_source(Arc::new(FakeSource::default())).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"lookup\",\"input\":{}}\n",
            "{\"message\":{\"content\":[{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"lookup\",\"input\":{}}]}}\n"
        )))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&chat_body("claude-opus-4.5", true))
        .await;

    response.assert_status_ok();
    let payloads = sse_payloads(&response.text());
    assert_eq!(payloads.len(), 3);
    assert_eq!(payloads[2], "[DONE]");

    let last: Value = serde_json::from_str(&payloads[1]).unwrap();
    assert_eq!(last["choices"][0]["finish_reason"], "stop");
}

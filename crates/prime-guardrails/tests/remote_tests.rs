#![cfg(feature = "remote")]

use httpmock::Method::POST;
use httpmock::MockServer;
use prime_guardrails::prelude::*;
use serde_json::json;
use std::time::Duration;

fn agent_for(server: &MockServer) -> SecurityAgent {
    SecurityAgent::builder()
        .api_key("test-key")
        .endpoint(server.base_url())
        .timeout_ms(2000)
        .build()
        .unwrap()
}

#[tokio::test]
async fn guard_input_sends_bearer_key_and_reads_verdict() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/guard/input")
                .header("authorization", "Bearer test-key")
                .body_includes("\"text\":\"User's message here\"");
            then.status(200).json_body(json!({
                "is_safe": false,
                "reason": "prompt injection",
                "categories": ["Jailbreak"]
            }));
        })
        .await;

    let agent = agent_for(&server);
    let result = agent.guard_input("User's message here").await.unwrap();

    mock.assert_async().await;
    assert!(!result.is_safe);
    assert_eq!(result.reason.as_deref(), Some("prompt injection"));
    assert_eq!(result.category, Some(SafetyCategory::Jailbreak));
}

#[tokio::test]
async fn guard_output_sends_reference_docs() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/guard/output")
                .body_includes("\"reference_docs\":[\"context\"]");
            then.status(200).json_body(json!({
                "is_safe": true,
                "sanitized_content": "cleaned"
            }));
        })
        .await;

    let agent = agent_for(&server);
    let llm_response = "raw";
    let result = agent
        .guard_output(llm_response, &["context".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(result.is_safe);
    assert_eq!(result.content_or(llm_response), "cleaned");
}

#[tokio::test]
async fn null_sanitized_content_falls_back() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/output");
            then.status(200)
                .json_body(json!({"is_safe": true, "sanitized_content": null}));
        })
        .await;

    let agent = agent_for(&server);
    let result = agent.guard_output("llm response", &[]).await.unwrap();

    assert!(result.sanitized_content.is_none());
    assert_eq!(result.content_or("llm response"), "llm response");
}

#[tokio::test]
async fn empty_sanitized_content_falls_back() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/output");
            then.status(200)
                .json_body(json!({"is_safe": true, "sanitized_content": ""}));
        })
        .await;

    let agent = agent_for(&server);
    let result = agent.guard_output("llm response", &[]).await.unwrap();

    assert!(result.is_safe);
    assert!(result.sanitized_content.is_none());
    assert_eq!(result.content_or("llm response"), "llm response");
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/input");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({"is_safe": true}));
        })
        .await;

    let agent = SecurityAgent::builder()
        .api_key("test-key")
        .endpoint(server.base_url())
        .timeout_ms(100)
        .build()
        .unwrap();

    let err = agent.guard_input("hi").await.unwrap_err();
    match err {
        GuardError::HttpError(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_maps_to_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/input");
            then.status(401).json_body(json!({"error": "invalid api key"}));
        })
        .await;

    let err = agent_for(&server).guard_input("hi").await.unwrap_err();
    match err {
        GuardError::Unauthorized(message) => assert_eq!(message, "invalid api key"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn throttled_maps_to_rate_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/input");
            then.status(429).body("slow down");
        })
        .await;

    let err = agent_for(&server).guard_input("hi").await.unwrap_err();
    assert!(matches!(err, GuardError::RateLimitExceeded(m) if m == "slow down"));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/output");
            then.status(503).body("maintenance");
        })
        .await;

    let err = agent_for(&server).guard_output("x", &[]).await.unwrap_err();
    assert!(matches!(err, GuardError::Api { status: 503, .. }));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/guard/input");
            then.status(200).body("not json");
        })
        .await;

    let err = agent_for(&server).guard_input("hi").await.unwrap_err();
    assert!(matches!(err, GuardError::InvalidResponse(_)));
}

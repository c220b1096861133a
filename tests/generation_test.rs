//! Gemini client against a mock HTTP server: retries, backoff, and
//! response parsing.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fairway::config::GenerationConfig;
use fairway::generation::{GeminiClient, GenerationError, ImageGenerator};

const ENDPOINT: &str = "/v1beta/models/test-model:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    let config = GenerationConfig {
        api_base: format!("{}/v1beta", server.uri()),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        max_attempts: 3,
        initial_backoff_ms: 5,
        timeout_secs: 5,
        ..Default::default()
    };
    GeminiClient::from_config(&config).unwrap()
}

fn image_body(bytes: &[u8]) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "Here is your diagram" },
                    { "inlineData": { "mimeType": "image/png", "data": BASE64.encode(bytes) } }
                ]
            }
        }]
    })
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body(b"styled")))
        .expect(1)
        .mount(&server)
        .await;

    let output = client(&server)
        .stylize(b"input", "image/jpeg", Some(9))
        .await
        .unwrap();
    assert_eq!(output.as_deref(), Some(&b"styled"[..]));

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .stylize(b"input", "image/png", None)
        .await
        .unwrap_err();
    match err {
        GenerationError::Status { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("bad image"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .stylize(b"input", "image/png", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 429, .. }));
}

#[tokio::test]
async fn internal_error_body_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "status": "INTERNAL", "message": "try again" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body(b"second")))
        .mount(&server)
        .await;

    let output = client(&server)
        .stylize(b"input", "image/png", None)
        .await
        .unwrap();
    assert_eq!(output.as_deref(), Some(&b"second"[..]));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn text_only_answer_yields_no_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that." }] } }]
        })))
        .mount(&server)
        .await;

    let output = client(&server)
        .stylize(b"input", "image/png", None)
        .await
        .unwrap();
    assert!(output.is_none());
}

#[tokio::test]
async fn request_carries_prompt_and_inline_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body(b"ok")))
        .mount(&server)
        .await;

    client(&server)
        .stylize(b"photo-bytes", "image/jpeg", Some(77))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = &body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("77"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["inlineData"]["data"], BASE64.encode(b"photo-bytes"));
}

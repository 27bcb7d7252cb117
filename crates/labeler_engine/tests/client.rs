use std::time::Duration;

use labeler_core::{FailureCategory, Sentiment};
use labeler_engine::{Classifier, ClientSettings, GeminiClassifier};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/test-model:generateContent";

fn settings_for(server: &MockServer) -> ClientSettings {
    let mut settings = ClientSettings::new("test-key");
    settings.base_url = format!("{}/v1beta", server.uri());
    settings.model = "test-model".to_string();
    settings.prompt = "classify: ".to_string();
    settings.request_timeout = Duration::from_secs(5);
    settings
}

fn answer(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ], "role": "model" } }
        ]
    })
}

async fn classify_with(response: ResponseTemplate, text: &str) -> Result<Sentiment, labeler_engine::ClassifyError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(response)
        .mount(&server)
        .await;
    let client = GeminiClassifier::new(settings_for(&server)).expect("client");
    client.classify(text).await
}

#[tokio::test]
async fn sends_prompt_and_parses_positive_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [ { "parts": [ { "text": "classify: 宿舍很乾淨" } ] } ],
            "generationConfig": { "topK": 40, "maxOutputTokens": 8192 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClassifier::new(settings_for(&server)).expect("client");
    let label = client.classify("宿舍很乾淨").await.expect("classified");
    assert_eq!(label, Sentiment::Positive);
}

#[tokio::test]
async fn quoted_answer_with_whitespace_is_accepted() {
    let label = classify_with(
        ResponseTemplate::new(200).set_body_json(answer(" '-1'\n")),
        "冷氣壞了",
    )
    .await
    .expect("classified");
    assert_eq!(label, Sentiment::Negative);
}

#[tokio::test]
async fn unexpected_answer_is_invalid_output() {
    let err = classify_with(ResponseTemplate::new(200).set_body_json(answer("maybe")), "text")
        .await
        .unwrap_err();
    assert_eq!(err.category, FailureCategory::InvalidOutput);
    assert!(err.message.contains("maybe"));
}

#[tokio::test]
async fn missing_candidates_is_invalid_output() {
    let err = classify_with(
        ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })),
        "text",
    )
    .await
    .unwrap_err();
    assert_eq!(err.category, FailureCategory::InvalidOutput);
}

#[tokio::test]
async fn status_429_is_rate_limited() {
    let err = classify_with(
        ResponseTemplate::new(429).set_body_string("{\"error\":{\"code\":429}}"),
        "text",
    )
    .await
    .unwrap_err();
    assert_eq!(err.category, FailureCategory::RateLimited);
}

#[tokio::test]
async fn quota_message_is_quota_exceeded() {
    let err = classify_with(
        ResponseTemplate::new(403).set_body_string("Quota exceeded for this project"),
        "text",
    )
    .await
    .unwrap_err();
    assert_eq!(err.category, FailureCategory::QuotaExceeded);
}

#[tokio::test]
async fn server_error_is_transient() {
    let err = classify_with(
        ResponseTemplate::new(500).set_body_string("backend unavailable"),
        "text",
    )
    .await
    .unwrap_err();
    assert_eq!(err.category, FailureCategory::TransientOther);
    assert!(err.message.contains("500"));
}

#[tokio::test]
async fn malformed_body_is_transient() {
    let err = classify_with(
        ResponseTemplate::new(200).set_body_raw("not json", "application/json"),
        "text",
    )
    .await
    .unwrap_err();
    assert_eq!(err.category, FailureCategory::TransientOther);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;
    let mut settings = settings_for(&server);
    settings.max_response_bytes = 1024;
    let client = GeminiClassifier::new(settings).expect("client");

    let err = client.classify("text").await.unwrap_err();
    assert!(err.message.contains("too large"));
}

#[tokio::test]
async fn transport_error_never_reveals_key() {
    let mut settings = ClientSettings::new("very-secret-key");
    settings.base_url = "http://127.0.0.1:9/v1beta".to_string();
    settings.connect_timeout = Duration::from_secs(2);
    settings.request_timeout = Duration::from_secs(2);
    let client = GeminiClassifier::new(settings).expect("client");

    let err = client.classify("text").await.unwrap_err();
    assert!(!err.message.contains("very-secret-key"));
    assert!(!err.to_string().contains("very-secret-key"));
}

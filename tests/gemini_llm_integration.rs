//! Gemini Language Model Integration Tests
//!
//! Exercises the generateContent client against a local mock server,
//! covering request shape, reply extraction, and error mapping.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atelier_gateway::core::{DataUrl, GeminiLLM, LLMError, LanguageModel};

const MODEL: &str = "gemini-1.5-flash-latest";

fn client(server: &MockServer) -> GeminiLLM {
    GeminiLLM::with_base_url("test-google-key", MODEL, server.uri()).expect("valid client")
}

#[tokio::test]
async fn test_reply_returns_first_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(query_param("key", "test-google-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "What is chiaroscuro?"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "A strong contrast "},
                    {"text": "between light and dark."}
                ]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let llm = client(&server);
    let reply = llm.reply("What is chiaroscuro?", None).await.unwrap();

    assert_eq!(reply, "A strong contrast between light and dark.");
}

#[tokio::test]
async fn test_reply_sends_inline_image_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(body_partial_json(json!({
            "contents": [{"parts": [
                {"text": "What medium is this?"},
                {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Watercolor."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = DataUrl::parse("data:image/png;base64,aGVsbG8=").unwrap();
    let llm = client(&server);
    let reply = llm.reply("What medium is this?", Some(&image)).await.unwrap();

    assert_eq!(reply, "Watercolor.");
}

#[tokio::test]
async fn test_reply_maps_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let llm = client(&server);
    let error = llm.reply("hello", None).await.unwrap_err();

    match error {
        LLMError::BadStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected BadStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_blocked_prompt_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let llm = client(&server);
    let error = llm.reply("hello", None).await.unwrap_err();

    assert!(matches!(error, LLMError::Blocked(reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_reply_without_candidates_is_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let llm = client(&server);
    let error = llm.reply("hello", None).await.unwrap_err();

    assert!(matches!(error, LLMError::EmptyCompletion));
}

//! Model backends against an in-process HTTP responder

mod fixtures;

use fixtures::{backend, closed_port, request, respond_once, silent_endpoint};
use pretty_assertions::assert_eq;
use querygate_core::{BackendKind, Filter, QueryIntent};
use querygate_translate::{
    LocalTranslator, RemoteTranslator, TranslationError, TranslationOutput, Translator,
};
use serde_json::json;

const MODEL_ANSWER: &str = r#"{"table_name": "ProductUsage", "columns": ["Product", "RequestCount"], "filters": [{"column": "Product", "operator": "like", "value": "%JavaScript%"}], "confidence": 0.92}"#;

fn expected_intent() -> QueryIntent {
    QueryIntent::new("ProductUsage")
        .with_columns(["Product", "RequestCount"])
        .with_filter(Filter::like("Product", "%JavaScript%"))
}

#[tokio::test]
async fn local_backend_generates_intent() {
    let body = json!({ "model": "test-model", "response": MODEL_ANSWER, "done": true }).to_string();
    let (endpoint, server) = respond_once(200, body).await;

    let translator = LocalTranslator::from_config(&backend(BackendKind::Local, &endpoint)).unwrap();
    let translation = translator.translate(&request("js usage")).await.unwrap();

    assert_eq!(translation.output, TranslationOutput::Intent(expected_intent()));

    let received = server.await.unwrap();
    assert!(received.starts_with("POST /api/generate "));
    assert!(received.contains("\"stream\":false"));
    assert!(received.contains("js usage"));
    assert!(received.contains("ProductUsage"));
}

#[tokio::test]
async fn remote_backend_sends_bearer_credential() {
    std::env::set_var("QUERYGATE_TEST_REMOTE_KEY", "test-secret");
    let body = json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": MODEL_ANSWER } }]
    })
    .to_string();
    let (endpoint, server) = respond_once(200, body).await;

    let mut config = backend(BackendKind::Remote, &format!("{}/v1/", endpoint));
    config.api_key_env = Some("QUERYGATE_TEST_REMOTE_KEY".to_string());
    let translator = RemoteTranslator::from_config(&config).unwrap();

    let translation = translator.translate(&request("js usage")).await.unwrap();
    assert_eq!(translation.output, TranslationOutput::Intent(expected_intent()));

    let received = server.await.unwrap();
    assert!(received.starts_with("POST /v1/chat/completions "));
    assert!(received
        .to_ascii_lowercase()
        .contains("authorization: bearer test-secret"));
}

#[tokio::test]
async fn remote_backend_without_credential() {
    let mut config = backend(BackendKind::Remote, "http://127.0.0.1:9");
    config.api_key_env = Some("QUERYGATE_TEST_UNSET_KEY".to_string());
    std::env::remove_var("QUERYGATE_TEST_UNSET_KEY");

    let translator = RemoteTranslator::from_config(&config).unwrap();
    let result = translator.translate(&request("js usage")).await;
    assert!(matches!(result, Err(TranslationError::Configuration(_))));

    config.api_key_env = None;
    let translator = RemoteTranslator::from_config(&config).unwrap();
    let result = translator.translate(&request("js usage")).await;
    assert!(matches!(result, Err(TranslationError::Configuration(_))));
}

#[tokio::test]
async fn unreachable_endpoint() {
    let endpoint = format!("http://127.0.0.1:{}", closed_port().await);
    let translator = LocalTranslator::from_config(&backend(BackendKind::Local, &endpoint)).unwrap();

    let result = translator.translate(&request("js usage")).await;
    assert!(
        matches!(result, Err(TranslationError::Unreachable(_))),
        "{:?}",
        result
    );
}

#[tokio::test]
async fn http_error_status() {
    let (endpoint, _server) = respond_once(500, json!({"error": "model not loaded"}).to_string()).await;
    let translator = LocalTranslator::from_config(&backend(BackendKind::Local, &endpoint)).unwrap();

    match translator.translate(&request("js usage")).await {
        Err(TranslationError::Rejected { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("model not loaded"));
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_answer() {
    let body = json!({ "response": "I am not sure what you mean." }).to_string();
    let (endpoint, _server) = respond_once(200, body).await;
    let translator = LocalTranslator::from_config(&backend(BackendKind::Local, &endpoint)).unwrap();

    let result = translator.translate(&request("js usage")).await;
    assert!(matches!(result, Err(TranslationError::MalformedResponse(_))));
}

#[tokio::test]
async fn answer_outside_schema() {
    let body = json!({ "response": r#"{"table_name": "Users", "columns": ["Email"]}"# }).to_string();
    let (endpoint, _server) = respond_once(200, body).await;
    let translator = LocalTranslator::from_config(&backend(BackendKind::Local, &endpoint)).unwrap();

    let result = translator.translate(&request("emails")).await;
    assert!(matches!(result, Err(TranslationError::SchemaMismatch(_))));
}

#[tokio::test]
async fn hung_endpoint_times_out() {
    let endpoint = silent_endpoint().await;
    let mut config = backend(BackendKind::Local, &endpoint);
    config.timeout_ms = 100;
    let translator = LocalTranslator::from_config(&config).unwrap();

    let result = translator.translate(&request("js usage")).await;
    assert_eq!(
        result,
        Err(TranslationError::Timeout(std::time::Duration::from_millis(100)))
    );
}

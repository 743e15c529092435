//! # Provider Tests
//!
//! The xAI and OpenAI-compatible clients against a local chat-completion
//! endpoint.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use smartscript::enhancement::TextEnhancer;
use smartscript::llm::{
    build_http_client, ChatCompletionProvider, ChatMessage, ChatRequest, LlmError,
    OpenAiProvider, XaiProvider,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn record(&self, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.auth.lock().push(auth);
        self.bodies.lock().push(body);
    }
}

fn completion(content: &str) -> Json<Value> {
    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn ok_completion(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorded.record(&headers, body);
    completion("Enhanced text").into_response()
}

async fn unavailable(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorded.record(&headers, body);
    (StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded").into_response()
}

async fn garbage(State(recorded): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    recorded.record(&headers, body);
    "not json at all".into_response()
}

async fn no_choices(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorded.record(&headers, body);
    Json(json!({ "choices": [] })).into_response()
}

/// Serve a fake endpoint on an ephemeral port and return its base URL
async fn spawn_endpoint() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/xai/ok", post(ok_completion))
        .route("/xai/down", post(unavailable))
        .route("/v1/chat/completions", post(ok_completion))
        .route("/broken/chat/completions", post(garbage))
        .route("/empty/chat/completions", post(no_choices))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", address), recorded)
}

fn client() -> reqwest::Client {
    build_http_client(Duration::from_secs(5)).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system("Enhance OCR text while preserving language."),
        ChatMessage::user("helo wrld"),
    ])
}

#[tokio::test]
async fn test_xai_posts_to_configured_endpoint() {
    let (base, recorded) = spawn_endpoint().await;
    let provider = XaiProvider::new(client(), "xai-key", format!("{}/xai/ok", base));

    let text = provider.complete(&request()).await.unwrap();

    assert_eq!(text, "Enhanced text");
    assert_eq!(recorded.auth.lock()[0], "Bearer xai-key");
    let body = recorded.bodies.lock()[0].clone();
    assert!(body.get("model").is_none());
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "helo wrld");
}

#[tokio::test]
async fn test_xai_sends_configured_model() {
    let (base, recorded) = spawn_endpoint().await;
    let provider = XaiProvider::new(client(), "xai-key", format!("{}/xai/ok", base))
        .with_model(Some("grok-2".to_string()));

    provider.complete(&request()).await.unwrap();

    assert_eq!(recorded.bodies.lock()[0]["model"], "grok-2");
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (base, _) = spawn_endpoint().await;
    let provider = XaiProvider::new(client(), "xai-key", format!("{}/xai/down", base));

    let err = provider.complete(&request()).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    match err {
        LlmError::Status { provider, body, .. } => {
            assert_eq!(provider, "xai");
            assert_eq!(body, "upstream overloaded");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_uses_default_model_and_path() {
    let (base, recorded) = spawn_endpoint().await;
    let provider =
        OpenAiProvider::new(client(), "openai-key", "gpt-4o").with_base_url(format!("{}/v1", base));

    let text = provider.complete(&request()).await.unwrap();

    assert_eq!(text, "Enhanced text");
    assert_eq!(recorded.auth.lock()[0], "Bearer openai-key");
    assert_eq!(recorded.bodies.lock()[0]["model"], "gpt-4o");
}

#[tokio::test]
async fn test_request_model_overrides_default() {
    let (base, recorded) = spawn_endpoint().await;
    let provider =
        OpenAiProvider::new(client(), "openai-key", "gpt-4o").with_base_url(format!("{}/v1", base));

    provider
        .complete(&request().with_model("gpt-4o-mini"))
        .await
        .unwrap();

    assert_eq!(recorded.bodies.lock()[0]["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_malformed_and_empty_bodies() {
    let (base, _) = spawn_endpoint().await;

    let broken = OpenAiProvider::new(client(), "k", "gpt-4o").with_base_url(format!("{}/broken", base));
    assert!(matches!(
        broken.complete(&request()).await,
        Err(LlmError::Decode(_))
    ));

    let empty = OpenAiProvider::new(client(), "k", "gpt-4o").with_base_url(format!("{}/empty", base));
    assert!(matches!(
        empty.complete(&request()).await,
        Err(LlmError::EmptyResponse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let provider = XaiProvider::new(client(), "k", format!("http://{}/xai/ok", address));
    assert!(matches!(
        provider.complete(&request()).await,
        Err(LlmError::Transport(_))
    ));
}

#[tokio::test]
async fn test_enhancer_falls_back_over_http() {
    let (base, recorded) = spawn_endpoint().await;
    let primary = Arc::new(XaiProvider::new(client(), "xai-key", format!("{}/xai/down", base)));
    let fallback = Arc::new(
        OpenAiProvider::new(client(), "openai-key", "gpt-4o").with_base_url(format!("{}/v1", base)),
    );

    let outcome = TextEnhancer::new(primary, fallback).enhance("helo wrld").await;

    assert_eq!(outcome.text, "Enhanced text");
    assert_eq!(outcome.source.label(), "openai");
    assert_eq!(recorded.bodies.lock().len(), 2);
}

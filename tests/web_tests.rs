//! # Web Tests
//!
//! Requests through the full router against fake OCR and chat-completion
//! backends.


use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use smartscript::language::Language;
use smartscript::web::{router, SESSION_COOKIE};
use test_helpers::{
    build_app, sample_png, status_error, FakeProvider, FakeRecognizerFactory, TestApp,
};
use tower::ServiceExt;

const BOUNDARY: &str = "smartscript-test-boundary";

fn default_app() -> TestApp {
    build_app(
        FakeRecognizerFactory::new()
            .with_output(Language::English, "helo wrld", 88.5)
            .with_output(Language::Hindi, "नमस्ते दुनिया", 73.0),
        FakeProvider::new("xai").replying("Hello world"),
        FakeProvider::new("openai"),
        FakeProvider::new("openai").replying("It says hello."),
    )
}

fn multipart_body(fields: &[(&str, &str)], document: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = document {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"note.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(path: &str, cookie: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn ask_json(question: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/ask")
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let body = serde_json::json!({ "question": question }).to_string();
    builder.body(Body::from(body)).unwrap()
}

/// `name=value` pair from the response's session cookie
fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_index_creates_session_and_renders_page() {
    let test_app = default_app();
    let app = router(test_app.state.clone());

    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(cookie.starts_with("smartscript_session="));

    let html = body_text(response).await;
    assert!(html.contains("SmartScript"));
    assert!(html.contains("dir=\"ltr\""));
    assert_eq!(test_app.state.sessions.len(), 1);

    // A known session is not re-issued
    let response = send(&app, get("/", Some(&cookie))).await;
    assert!(session_cookie(&response).is_none());
    assert_eq!(test_app.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_arabic_ui_is_right_to_left() {
    let test_app = default_app();
    let app = router(test_app.state);

    let response = send(&app, get("/?ui=ar", None)).await;
    let html = body_text(response).await;
    assert!(html.contains("lang=\"ar\""));
    assert!(html.contains("dir=\"rtl\""));
}

#[tokio::test]
async fn test_ask_before_analysis_needs_document() {
    let test_app = default_app();
    let app = router(test_app.state);

    let response = send(&app, ask_json("What does it say?", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "needs_document");
    assert_eq!(
        json["message"],
        "Please process a document first in the OCR Processing tab."
    );
    assert_eq!(test_app.qa.calls(), 0);
}

#[tokio::test]
async fn test_analyze_then_ask_flow() {
    let test_app = default_app();
    let app = router(test_app.state.clone());

    let body = multipart_body(
        &[("language", "en"), ("mode", "genai_enhanced")],
        Some(&sample_png()),
    );
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");

    let json = body_json(response).await;
    assert_eq!(json["text"], "Hello world");
    assert_eq!(json["source"], "xai");
    assert_eq!(json["language"], "english");
    assert_eq!(json["mode"], "genai_enhanced");
    assert_eq!(json["confidence"], 88.5);
    assert_eq!(test_app.primary.calls(), 1);
    assert_eq!(test_app.fallback.calls(), 0);

    let response = send(&app, ask_json("What does it say?", Some(&cookie))).await;
    let json = body_json(response).await;
    assert_eq!(json["status"], "answered");
    assert_eq!(json["answer"], "It says hello.");

    let question_sent = &test_app.qa.requests()[0].messages[1].content;
    assert!(question_sent.contains("Text: Hello world"));

    let response = send(&app, get("/api/session", Some(&cookie))).await;
    let json = body_json(response).await;
    assert_eq!(json["has_image"], true);
    assert_eq!(json["result"]["text"], "Hello world");
    assert_eq!(json["last_qa"]["question"], "What does it say?");
}

#[tokio::test]
async fn test_traditional_analysis_in_hindi() {
    let test_app = default_app();
    let app = router(test_app.state.clone());

    let body = multipart_body(
        &[("language", "hi"), ("mode", "traditional")],
        Some(&sample_png()),
    );
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    let json = body_json(response).await;

    assert_eq!(json["text"], "नमस्ते दुनिया");
    assert_eq!(json["source"], "ocr");
    assert_eq!(test_app.primary.calls(), 0);
    assert_eq!(test_app.factory.created(), vec![Language::Hindi]);
}

#[tokio::test]
async fn test_failed_enhancement_keeps_ocr_text() {
    let test_app = build_app(
        FakeRecognizerFactory::new().with_output(Language::English, "helo wrld", 60.0),
        FakeProvider::new("xai").failing(status_error("xai", 502)),
        FakeProvider::new("openai").failing(status_error("openai", 401)),
        FakeProvider::new("openai"),
    );
    let app = router(test_app.state.clone());

    let body = multipart_body(&[("language", "en")], Some(&sample_png()));
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["text"], "helo wrld");
    assert_eq!(json["source"], "ocr");
    assert!(json["notice"]
        .as_str()
        .expect("notice")
        .starts_with("GenAI Error:"));
    assert_eq!(test_app.fallback.calls(), 1);
}

#[tokio::test]
async fn test_analyze_without_upload_is_rejected() {
    let test_app = default_app();
    let app = router(test_app.state);

    let body = multipart_body(&[("language", "en")], None);
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Error: Please upload a document before analyzing."
    );
}

#[tokio::test]
async fn test_missing_upload_message_follows_ui_language() {
    let test_app = default_app();
    let app = router(test_app.state);

    let body = multipart_body(&[("language", "hi")], None);
    let response = send(&app, analyze_request("/api/analyze?ui=hi", None, body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "त्रुटि: विश्लेषण से पहले कृपया एक दस्तावेज़ अपलोड करें।"
    );

    let body = multipart_body(&[("language", "ar")], None);
    let response = send(&app, analyze_request("/analyze?ui=ar", None, body)).await;
    let html = body_text(response).await;
    assert!(html.contains("يرجى رفع مستند قبل التحليل."));
    assert!(!html.contains("Please upload a document before analyzing."));
}

#[tokio::test]
async fn test_unsupported_upload_is_rejected() {
    let test_app = default_app();
    let app = router(test_app.state.clone());

    let body = multipart_body(&[], Some(b"GIF89a-not-a-supported-image"));
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    let error = json["error"].as_str().expect("error text");
    assert!(error.starts_with("Error: Image validation failed"));
    assert!(test_app.factory.created().is_empty());
}

#[tokio::test]
async fn test_html_analyze_renders_result() {
    let test_app = default_app();
    let app = router(test_app.state);

    let body = multipart_body(&[("mode", "traditional")], Some(&sample_png()));
    let response = send(&app, analyze_request("/analyze", None, body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("helo wrld"));
    assert!(html.contains("88.50%"));
}

#[tokio::test]
async fn test_image_route_serves_upload() {
    let test_app = default_app();
    let app = router(test_app.state);

    let response = send(&app, get("/image", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let cookie = session_cookie(&response).expect("session cookie");

    let png = sample_png();
    let body = multipart_body(&[("mode", "traditional")], Some(&png));
    send(&app, analyze_request("/api/analyze", Some(&cookie), body)).await;

    let response = send(&app, get("/image", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), png.as_slice());
}

#[tokio::test]
async fn test_reset_clears_session() {
    let test_app = default_app();
    let app = router(test_app.state.clone());

    let body = multipart_body(&[("mode", "traditional")], Some(&sample_png()));
    let response = send(&app, analyze_request("/api/analyze", None, body)).await;
    let cookie = session_cookie(&response).expect("session cookie");

    let reset = Request::builder()
        .method("POST")
        .uri("/reset?ui=hi")
        .header(COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, reset).await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/?ui=hi");

    let response = send(&app, get("/api/session", Some(&cookie))).await;
    let json = body_json(response).await;
    assert_eq!(json["has_image"], false);
    assert!(json["result"].is_null());
}

#[tokio::test]
async fn test_health_probes() {
    let test_app = default_app();
    let app = router(test_app.state);

    let response = send(&app, get("/health/live", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");

    // Providers are not configured in the test state
    let response = send(&app, get("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.starts_with("NOT READY"));
}

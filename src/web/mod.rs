//! # Web Surface
//!
//! The browser UI and its JSON twin, served by `axum`.
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | Page with the OCR and Q&A tabs |
//! | `POST /analyze` | Multipart upload + analysis, re-renders the page |
//! | `POST /ask` | Question about the extracted text, re-renders the page |
//! | `GET /image` | The session's uploaded image |
//! | `POST /reset` | Drop the session's state |
//! | `POST /api/analyze`, `POST /api/ask`, `GET /api/session` | JSON API |
//! | `GET /health/live`, `GET /health/ready` | Probes |
//!
//! Each browser is tied to its state by the `smartscript_session` cookie.

pub mod handlers;
pub mod ui_components;

use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequestParts, MatchedPath, Query, Request};
use axum::http::header::{ACCEPT_LANGUAGE, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::localization::{detect_language, LocalizationManager};
use crate::observability::{self, ReadinessContext};
use crate::qa::QuestionAnswerer;
use crate::session::SessionStore;

pub const SESSION_COOKIE: &str = "smartscript_session";

/// Room for multipart boundaries and the small form fields next to the file
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub analyzer: Arc<Analyzer>,
    pub answerer: Arc<QuestionAnswerer>,
    pub localization: Arc<LocalizationManager>,
    pub readiness: ReadinessContext,
}

impl AppState {
    /// Largest request body accepted
    pub fn body_limit(&self) -> usize {
        self.analyzer.ocr_config().max_file_size as usize + MULTIPART_OVERHEAD_BYTES
    }

    /// Upload limit in whole megabytes, for display
    pub fn max_upload_mb(&self) -> u64 {
        self.analyzer.ocr_config().max_file_size / (1024 * 1024)
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .route("/", get(handlers::index))
        .route("/analyze", post(handlers::analyze))
        .route("/ask", post(handlers::ask))
        .route("/image", get(handlers::image))
        .route("/reset", post(handlers::reset))
        .route("/api/analyze", post(handlers::api_analyze))
        .route("/api/ask", post(handlers::api_ask))
        .route("/api/session", get(handlers::api_session))
        .route("/health/live", get(handlers::live))
        .route("/health/ready", get(handlers::ready))
        .layer(middleware::from_fn(track_requests))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn track_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    observability::record_request_metrics(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed(),
    );
    response
}

/// Session id read from the `Cookie` header
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// The caller's session, created on first contact
#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    pub id: Uuid,
    pub created: bool,
}

impl SessionHandle {
    /// Attach the session cookie when the session was just created
    pub fn attach(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.created {
            if let Ok(value) = HeaderValue::from_str(&session_cookie(self.id)) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionHandle {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let requested = session_id_from_headers(&parts.headers);
        let (id, created) = state.sessions.resolve(requested);
        Ok(SessionHandle { id, created })
    }
}

#[derive(Debug, Deserialize)]
struct UiQuery {
    ui: Option<String>,
}

/// UI language for the response, from `?ui=` or `Accept-Language`
#[derive(Debug, Clone, Copy)]
pub struct UiLocale(pub &'static str);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UiLocale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let explicit = Query::<UiQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.ui);
        let accept_language = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        Ok(UiLocale(detect_language(explicit.as_deref(), accept_language)))
    }
}

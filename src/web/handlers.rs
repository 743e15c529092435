//! Request handlers for the page, the JSON API and the probes
//!
//! Domain failures (bad upload, OCR error, provider error) are rendered as
//! notifications or JSON error bodies; they never turn into 5xx responses.

use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::ui_components::{render_page, Notice, PageView, Tab};
use super::{AppState, SessionHandle, UiLocale};
use crate::analysis::MISSING_IMAGE_MESSAGE;
use crate::errors::{error_logging, AppError, AppResult};
use crate::language::{Language, ProcessingMode};
use crate::observability::{self, perform_readiness_checks};
use crate::ocr;
use crate::qa::QaOutcome;
use crate::session::{AnalysisResult, QaExchange, SessionSummary, UploadedImage};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub tab: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

/// Uploaded file as received
#[derive(Debug)]
pub struct DocumentUpload {
    pub bytes: Bytes,
    pub file_name: Option<String>,
}

/// Fields of the analyze form; absent fields keep the session's choice
#[derive(Debug, Default)]
pub struct AnalyzeForm {
    pub language: Option<Language>,
    pub mode: Option<ProcessingMode>,
    pub document: Option<DocumentUpload>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON answer to `POST /api/ask`
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AskResponse {
    Answered { question: String, answer: String },
    NeedsDocument { message: String },
    EmptyQuestion { message: String },
    Failed { question: String, error: String },
}

fn invalid_form(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid form data: {}", err))
}

/// Read the multipart analyze form
///
/// An empty file part (no file chosen) counts as no upload.
pub async fn read_analyze_form(mut multipart: Multipart) -> AppResult<AnalyzeForm> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "language" => {
                let value = field.text().await.map_err(invalid_form)?;
                form.language = Some(value.parse()?);
            }
            "mode" => {
                let value = field.text().await.map_err(invalid_form)?;
                form.mode = Some(value.parse()?);
            }
            "document" => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_form)?;
                if !bytes.is_empty() {
                    form.document = Some(DocumentUpload { bytes, file_name });
                }
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Store a new upload (if any) and run the analyze pipeline for the session
async fn run_analysis(
    state: &AppState,
    session_id: Uuid,
    form: AnalyzeForm,
) -> AppResult<AnalysisResult> {
    let (current_language, current_mode) = state
        .sessions
        .with_session(session_id, |session| (session.language, session.mode));
    let language = form.language.unwrap_or(current_language);
    let mode = form.mode.unwrap_or(current_mode);

    if let Some(document) = form.document {
        let format = ocr::validate_image_bytes(&document.bytes, state.analyzer.ocr_config())
            .map_err(|err| {
                error_logging::log_validation_error(
                    &err,
                    "upload_document",
                    Some(&session_id.to_string()),
                    "image",
                    document.file_name.as_deref(),
                );
                AppError::from(err)
            })?;

        let image = UploadedImage {
            bytes: Arc::from(document.bytes.as_ref()),
            format,
            file_name: document.file_name,
        };
        debug!(session_id = %session_id, bytes = image.size(), "Stored uploaded document");
        state
            .sessions
            .with_session(session_id, |session| session.image = Some(image));
    }

    state
        .analyzer
        .analyze_document(&state.sessions, session_id, language, mode)
        .await
}

async fn analyze_upload(
    state: &AppState,
    session_id: Uuid,
    multipart: Multipart,
) -> AppResult<AnalysisResult> {
    let form = read_analyze_form(multipart).await?;
    run_analysis(state, session_id, form).await
}

/// User-facing text for a failed analysis
fn analysis_error_text(state: &AppState, locale: &str, err: &AppError) -> String {
    let detail = match err {
        AppError::Validation(message) if message == MISSING_IMAGE_MESSAGE => state
            .localization
            .get_message_in_language("missing-image", locale, None),
        other => other.user_message().to_string(),
    };
    state.localization.get_message_with_args_in_language(
        "analysis-error",
        locale,
        &[("error", detail.as_str())],
    )
}

fn render(
    state: &AppState,
    session: SessionHandle,
    locale: &'static str,
    tab: Tab,
    notice: Option<Notice>,
) -> Response {
    let snapshot = state.sessions.snapshot(session.id);
    let html = render_page(&PageView {
        localization: &state.localization,
        locale,
        tab,
        session: &snapshot,
        notice: notice.as_ref(),
        max_upload_mb: state.max_upload_mb(),
    });
    session.attach(Html(html))
}

/// `GET /`
pub async fn index(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
    Query(query): Query<PageQuery>,
) -> Response {
    render(
        &state,
        session,
        locale,
        Tab::from_query(query.tab.as_deref()),
        None,
    )
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
    multipart: Multipart,
) -> Response {
    let span = observability::web_span("analyze", &session.id);
    let outcome = analyze_upload(&state, session.id, multipart)
        .instrument(span)
        .await;

    let notice = outcome
        .err()
        .map(|err| Notice::error(analysis_error_text(&state, locale, &err)));
    render(&state, session, locale, Tab::Ocr, notice)
}

/// `POST /ask`
pub async fn ask(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
    Form(form): Form<AskForm>,
) -> Response {
    let outcome = answer_question(&state, session.id, &form.question).await;

    let notice = match outcome {
        QaOutcome::Answered { .. } => None,
        QaOutcome::NeedsDocument => None,
        QaOutcome::EmptyQuestion => Some(Notice::warning(
            state
                .localization
                .get_message_in_language("qa-empty-question", locale, None),
        )),
        QaOutcome::Failed { error, .. } => Some(Notice::error(
            state.localization.get_message_with_args_in_language(
                "qa-error",
                locale,
                &[("error", error.as_str())],
            ),
        )),
    };
    render(&state, session, locale, Tab::Qa, notice)
}

/// Ask about the session's document and remember a successful answer
async fn answer_question(state: &AppState, session_id: Uuid, question: &str) -> QaOutcome {
    let text = state.sessions.with_session(session_id, |session| {
        session.extracted_text().map(str::to_string)
    });

    let span = observability::web_span("ask", &session_id);
    let outcome = state
        .answerer
        .ask(text.as_deref(), question)
        .instrument(span)
        .await;

    if let QaOutcome::Answered { question, answer } = &outcome {
        let exchange = QaExchange {
            question: question.clone(),
            answer: answer.clone(),
        };
        state
            .sessions
            .with_session(session_id, |session| session.last_qa = Some(exchange));
    }

    outcome
}

/// `GET /image`
pub async fn image(State(state): State<AppState>, session: SessionHandle) -> Response {
    let image = state
        .sessions
        .with_session(session.id, |session| session.image.clone());

    match image {
        Some(image) => session.attach((
            [
                (CONTENT_TYPE, image.content_type()),
                (CACHE_CONTROL, "no-store"),
            ],
            Bytes::copy_from_slice(&image.bytes),
        )),
        None => session.attach((StatusCode::NOT_FOUND, "No document uploaded")),
    }
}

/// `POST /reset`
pub async fn reset(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
) -> Response {
    state.sessions.reset(session.id);
    session.attach(Redirect::to(&format!("/?ui={}", locale)))
}

/// `POST /api/analyze`
pub async fn api_analyze(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
    multipart: Multipart,
) -> Response {
    let span = observability::web_span("api_analyze", &session.id);
    let outcome = analyze_upload(&state, session.id, multipart)
        .instrument(span)
        .await;

    match outcome {
        Ok(result) => session.attach(Json(result)),
        Err(err) => session.attach((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: analysis_error_text(&state, locale, &err),
            }),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

/// `POST /api/ask`
pub async fn api_ask(
    State(state): State<AppState>,
    session: SessionHandle,
    UiLocale(locale): UiLocale,
    Json(request): Json<AskRequest>,
) -> Response {
    let outcome = answer_question(&state, session.id, &request.question).await;
    let t = |key: &str| state.localization.get_message_in_language(key, locale, None);

    let response = match outcome {
        QaOutcome::Answered { question, answer } => AskResponse::Answered { question, answer },
        QaOutcome::NeedsDocument => AskResponse::NeedsDocument {
            message: t("qa-need-document"),
        },
        QaOutcome::EmptyQuestion => AskResponse::EmptyQuestion {
            message: t("qa-empty-question"),
        },
        QaOutcome::Failed { question, error } => AskResponse::Failed {
            question,
            error: state.localization.get_message_with_args_in_language(
                "qa-error",
                locale,
                &[("error", error.as_str())],
            ),
        },
    };
    session.attach(Json(response))
}

/// `GET /api/session`
pub async fn api_session(State(state): State<AppState>, session: SessionHandle) -> Response {
    let summary = state
        .sessions
        .with_session(session.id, |session| SessionSummary::from(&*session));
    session.attach(Json(summary))
}

/// `GET /health/live`
pub async fn live() -> impl IntoResponse {
    "OK"
}

/// `GET /health/ready`
pub async fn ready(State(state): State<AppState>) -> Response {
    match perform_readiness_checks(&state.readiness).await {
        Ok(()) => (StatusCode::OK, "OK".to_string()).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("NOT READY: {}", e)).into_response(),
    }
}

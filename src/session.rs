//! # Session State
//!
//! Transient, per-browser-session state: the selected language and mode, the
//! uploaded image, the last analysis result and the last question/answer pair.
//! Nothing is persisted; a session disappears after it has been idle for the
//! configured TTL.

use chrono::{DateTime, Utc};
use image::ImageFormat;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::language::{Language, ProcessingMode};

/// Uploaded document image
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn content_type(&self) -> &'static str {
        crate::ocr::content_type_for(self.format)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Outcome of the last successful analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub text: String,
    /// Confidence percentage in `[0, 100]`
    pub confidence: f32,
    /// Seconds, two decimals
    pub processing_secs: f64,
    pub language: Language,
    pub mode: ProcessingMode,
    /// `ocr`, or the provider that produced the final text
    pub source: String,
    /// Enhancement error notice, if enhancement fell back to the OCR text
    pub notice: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Last question and its answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaExchange {
    pub question: String,
    pub answer: String,
}

/// State carried across interactions of one browser session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub language: Language,
    pub mode: ProcessingMode,
    pub image: Option<UploadedImage>,
    pub result: Option<AnalysisResult>,
    pub last_qa: Option<QaExchange>,
    last_access: Instant,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            language: Language::default(),
            mode: ProcessingMode::default(),
            image: None,
            result: None,
            last_qa: None,
            last_access: Instant::now(),
        }
    }
}

impl SessionState {
    /// Text a question can be asked about, if a document has been processed
    pub fn extracted_text(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.text.as_str())
    }

    /// Store a new analysis result; the previous Q&A no longer applies
    pub fn record_result(&mut self, result: AnalysisResult) {
        self.result = Some(result);
        self.last_qa = None;
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_access.elapsed()
    }
}

/// JSON view of a session without the image bytes
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub language: Language,
    pub mode: ProcessingMode,
    pub has_image: bool,
    pub image_bytes: Option<usize>,
    pub result: Option<AnalysisResult>,
    pub last_qa: Option<QaExchange>,
}

impl From<&SessionState> for SessionSummary {
    fn from(state: &SessionState) -> Self {
        Self {
            language: state.language,
            mode: state.mode,
            has_image: state.image.is_some(),
            image_bytes: state.image.as_ref().map(UploadedImage::size),
            result: state.result.clone(),
            last_qa: state.last_qa.clone(),
        }
    }
}

/// In-memory session store keyed by session id
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionState>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Resolve the caller's session, creating one when the id is unknown
    ///
    /// Returns the id to use and whether a new session was created.
    pub fn resolve(&self, id: Option<Uuid>) -> (Uuid, bool) {
        let mut sessions = self.sessions.lock();
        if let Some(id) = id {
            if let Some(state) = sessions.get_mut(&id) {
                state.touch();
                return (id, false);
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(id, SessionState::default());
        crate::observability::record_active_sessions(sessions.len());
        debug!(session_id = %id, "Created session");
        (id, true)
    }

    /// Run `f` against the session's state, creating it if it has expired meanwhile
    pub fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.sessions.lock();
        let state = sessions.entry(id).or_default();
        state.touch();
        f(state)
    }

    /// Clone of the session's state
    pub fn snapshot(&self, id: Uuid) -> SessionState {
        self.with_session(id, |state| state.clone())
    }

    /// Forget everything the session holds
    pub fn reset(&self, id: Uuid) {
        self.with_session(id, |state| *state = SessionState::default());
        info!(session_id = %id, "Session reset");
    }

    /// Drop sessions idle for longer than the TTL
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, state| state.idle_for() < self.ttl);
        let removed = before - sessions.len();
        crate::observability::record_active_sessions(sessions.len());
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Expired idle sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically purge expired sessions
    pub fn start_sweeper(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.purge_expired();
            }
        })
    }
}

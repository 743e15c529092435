//! # Document Analysis
//!
//! The analyze pipeline behind the "Analyze Document" action: OCR in the
//! selected language, optional enhancement, timing, and storing the result in
//! the caller's session.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::enhancement::TextEnhancer;
use crate::errors::{error_logging, AppError, AppResult};
use crate::instance_manager::OcrInstanceManager;
use crate::language::{Language, ProcessingMode};
use crate::observability;
use crate::ocr;
use crate::ocr_config::OcrConfig;
use crate::session::{AnalysisResult, SessionStore, UploadedImage};

pub const MISSING_IMAGE_MESSAGE: &str = "Please upload a document before analyzing.";

/// Round seconds to two decimals
pub fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// OCR plus optional enhancement over one uploaded image
pub struct Analyzer {
    ocr_manager: Arc<OcrInstanceManager>,
    ocr_config: OcrConfig,
    enhancer: Arc<TextEnhancer>,
}

impl Analyzer {
    pub fn new(
        ocr_manager: Arc<OcrInstanceManager>,
        ocr_config: OcrConfig,
        enhancer: Arc<TextEnhancer>,
    ) -> Self {
        Self {
            ocr_manager,
            ocr_config,
            enhancer,
        }
    }

    pub fn ocr_manager(&self) -> &Arc<OcrInstanceManager> {
        &self.ocr_manager
    }

    pub fn ocr_config(&self) -> &OcrConfig {
        &self.ocr_config
    }

    /// Analyze `image` without touching any session
    ///
    /// Processing time covers both OCR and enhancement.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ocr` when recognition fails. Enhancement failures are
    /// reported through `AnalysisResult::notice` instead.
    pub async fn analyze(
        &self,
        image: &UploadedImage,
        language: Language,
        mode: ProcessingMode,
    ) -> AppResult<AnalysisResult> {
        let start = Instant::now();

        let outcome =
            ocr::extract_text(&image.bytes, language, &self.ocr_config, &self.ocr_manager).await?;

        let (text, source, notice) = match mode {
            ProcessingMode::GenAiEnhanced if !outcome.text.trim().is_empty() => {
                let enhanced = self.enhancer.enhance(&outcome.text).await;
                (enhanced.text, enhanced.source.label().to_string(), enhanced.notice)
            }
            _ => (outcome.text, "ocr".to_string(), None),
        };

        let processing_secs = round_secs(start.elapsed().as_secs_f64());
        observability::record_analysis_metrics(mode, &source, processing_secs);

        Ok(AnalysisResult {
            text,
            confidence: outcome.confidence,
            processing_secs,
            language,
            mode,
            source,
            notice,
            processed_at: Utc::now(),
        })
    }

    /// Run the pipeline for a session and store the result there
    ///
    /// The chosen language and mode are remembered even when analysis fails.
    /// On success the previous result and Q&A are replaced; on failure they
    /// are left as they were.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` if the session holds no uploaded image
    /// - `AppError::Ocr` if recognition fails
    pub async fn analyze_document(
        &self,
        store: &SessionStore,
        session_id: Uuid,
        language: Language,
        mode: ProcessingMode,
    ) -> AppResult<AnalysisResult> {
        let image = store.with_session(session_id, |state| {
            state.language = language;
            state.mode = mode;
            state.image.clone()
        });

        let Some(image) = image else {
            let err = AppError::Validation(MISSING_IMAGE_MESSAGE.to_string());
            error_logging::log_validation_error(
                &err,
                "analyze_document",
                Some(&session_id.to_string()),
                "image",
                None,
            );
            return Err(err);
        };

        let span = observability::web_span("analyze_document", &session_id);
        let result = self.analyze(&image, language, mode).instrument(span).await?;

        info!(
            session_id = %session_id,
            language = language.code(),
            mode = mode.as_str(),
            source = %result.source,
            confidence = result.confidence,
            processing_secs = result.processing_secs,
            "Document analyzed"
        );

        store.with_session(session_id, |state| state.record_result(result.clone()));
        Ok(result)
    }
}

//! # Text Enhancement
//!
//! Rewrites raw OCR output through a chat-completion provider while keeping the
//! document's language.
//!
//! ## Provider Order
//!
//! | Primary outcome | Action |
//! |-----------------|--------|
//! | success | use the primary's text |
//! | non-success HTTP status | ask the fallback provider, once |
//! | any other error | keep the OCR text, report a notice |
//! | fallback error | keep the OCR text, report a notice |
//!
//! Enhancement never fails the analysis: the caller always gets text back.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

use crate::errors::error_logging;
use crate::llm::{ChatCompletionProvider, ChatMessage, ChatRequest, LlmError};
use crate::observability;

pub const PRIMARY_SYSTEM_PROMPT: &str = "You are an OCR enhancement assistant.";
pub const PRIMARY_USER_PREFIX: &str = "Enhance this text preserving language: ";
pub const FALLBACK_SYSTEM_PROMPT: &str = "Enhance OCR text while preserving language.";

/// Which step produced the final text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancementSource {
    /// The primary provider answered
    Primary(String),
    /// The fallback provider answered after the primary's non-success status
    Fallback(String),
    /// Enhancement failed; the OCR text is returned unchanged
    Unchanged,
}

impl EnhancementSource {
    /// Provider name, or `ocr` when the text was left unchanged
    pub fn label(&self) -> &str {
        match self {
            EnhancementSource::Primary(name) | EnhancementSource::Fallback(name) => name,
            EnhancementSource::Unchanged => "ocr",
        }
    }
}

/// Result of an enhancement attempt
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementOutcome {
    pub text: String,
    pub source: EnhancementSource,
    /// User-visible error notice when enhancement failed
    pub notice: Option<String>,
}

/// Primary/fallback text enhancer
pub struct TextEnhancer {
    primary: Arc<dyn ChatCompletionProvider>,
    fallback: Arc<dyn ChatCompletionProvider>,
}

impl TextEnhancer {
    pub fn new(
        primary: Arc<dyn ChatCompletionProvider>,
        fallback: Arc<dyn ChatCompletionProvider>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Conversation sent to the primary endpoint
    pub fn primary_request(text: &str) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::assistant(PRIMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!("{PRIMARY_USER_PREFIX}{text}")),
        ])
    }

    /// Conversation sent to the fallback provider
    pub fn fallback_request(text: &str) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system(FALLBACK_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ])
    }

    /// Enhance `text`, returning it unchanged with a notice on failure
    pub async fn enhance(&self, text: &str) -> EnhancementOutcome {
        let span = observability::llm_span("enhance", self.primary.name());
        self.enhance_inner(text).instrument(span).await
    }

    async fn enhance_inner(&self, text: &str) -> EnhancementOutcome {
        let start = Instant::now();
        let primary_result = self.primary.complete(&Self::primary_request(text)).await;
        observability::record_llm_metrics(
            self.primary.name(),
            "enhance",
            primary_result.is_ok(),
            start.elapsed(),
        );

        match primary_result {
            Ok(enhanced) => {
                info!(provider = self.primary.name(), "Text enhanced by primary provider");
                EnhancementOutcome {
                    text: enhanced,
                    source: EnhancementSource::Primary(self.primary.name().to_string()),
                    notice: None,
                }
            }
            Err(err @ LlmError::Status { .. }) => {
                warn!(
                    provider = self.primary.name(),
                    status = ?err.status(),
                    fallback = self.fallback.name(),
                    "Primary enhancement returned non-success status, falling back"
                );
                self.enhance_with_fallback(text).await
            }
            Err(err) => self.unchanged(text, self.primary.name(), err, start),
        }
    }

    async fn enhance_with_fallback(&self, text: &str) -> EnhancementOutcome {
        let start = Instant::now();
        let result = self.fallback.complete(&Self::fallback_request(text)).await;
        observability::record_llm_metrics(
            self.fallback.name(),
            "enhance_fallback",
            result.is_ok(),
            start.elapsed(),
        );

        match result {
            Ok(enhanced) => {
                info!(provider = self.fallback.name(), "Text enhanced by fallback provider");
                EnhancementOutcome {
                    text: enhanced,
                    source: EnhancementSource::Fallback(self.fallback.name().to_string()),
                    notice: None,
                }
            }
            Err(err) => self.unchanged(text, self.fallback.name(), err, start),
        }
    }

    fn unchanged(
        &self,
        text: &str,
        provider: &str,
        err: LlmError,
        start: Instant,
    ) -> EnhancementOutcome {
        error_logging::log_llm_error(
            &err,
            "enhance",
            provider,
            err.status(),
            Some(start.elapsed()),
        );
        EnhancementOutcome {
            text: text.to_string(),
            source: EnhancementSource::Unchanged,
            notice: Some(format!("GenAI Error: {err}")),
        }
    }
}

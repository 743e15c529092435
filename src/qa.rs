//! # Document Question Answering
//!
//! Answers free-text questions about the text extracted from the session's
//! document. Each question is a single provider call: no retry, no caching.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

use crate::errors::error_logging;
use crate::llm::{ChatCompletionProvider, ChatMessage, ChatRequest};
use crate::observability;

pub const QA_SYSTEM_PROMPT: &str = "Answer questions based on the provided text.";
pub const DEFAULT_QA_MODEL: &str = "gpt-4o-mini";

/// Outcome of asking a question
#[derive(Debug, Clone, PartialEq)]
pub enum QaOutcome {
    /// The provider answered
    Answered { question: String, answer: String },
    /// No document has been processed yet; nothing was sent
    NeedsDocument,
    /// The question was blank; nothing was sent
    EmptyQuestion,
    /// The provider call failed
    Failed { question: String, error: String },
}

/// Question answerer over extracted document text
pub struct QuestionAnswerer {
    provider: Arc<dyn ChatCompletionProvider>,
    model: String,
}

impl QuestionAnswerer {
    pub fn new(provider: Arc<dyn ChatCompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Conversation sent for a question about `text`
    pub fn request(&self, text: &str, question: &str) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system(QA_SYSTEM_PROMPT),
            ChatMessage::user(format!("Text: {text}\nQuestion: {question}")),
        ])
        .with_model(self.model.clone())
    }

    /// Answer `question` about `document_text`
    ///
    /// Without document text the provider is not called.
    pub async fn ask(&self, document_text: Option<&str>, question: &str) -> QaOutcome {
        let Some(text) = document_text else {
            return QaOutcome::NeedsDocument;
        };

        let question = question.trim();
        if question.is_empty() {
            return QaOutcome::EmptyQuestion;
        }

        let span = observability::llm_span("answer_question", self.provider.name());
        let start = Instant::now();
        let result = self
            .provider
            .complete(&self.request(text, question))
            .instrument(span)
            .await;
        let duration = start.elapsed();
        observability::record_llm_metrics(self.provider.name(), "qa", result.is_ok(), duration);

        match result {
            Ok(answer) => {
                info!(
                    provider = self.provider.name(),
                    duration_ms = duration.as_millis() as u64,
                    "Question answered"
                );
                QaOutcome::Answered {
                    question: question.to_string(),
                    answer,
                }
            }
            Err(err) => {
                error_logging::log_llm_error(
                    &err,
                    "answer_question",
                    self.provider.name(),
                    err.status(),
                    Some(duration),
                );
                QaOutcome::Failed {
                    question: question.to_string(),
                    error: err.to_string(),
                }
            }
        }
    }
}

//! # Application Error Types
//!
//! This module defines common error types used throughout the SmartScript application.
//! It provides structured error handling for the OCR pipeline, the chat-completion
//! providers and the web layer.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (uploads, questions, form fields)
    Validation(String),
    /// OCR processing errors
    Ocr(String),
    /// Chat-completion provider errors
    Llm(String),
    /// Session state errors
    Session(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Ocr(msg) => write!(f, "[OCR] {}", msg),
            AppError::Llm(msg) => write!(f, "[LLM] {}", msg),
            AppError::Session(msg) => write!(f, "[SESSION] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Message suitable for showing to the user, without the category tag
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Config(msg)
            | AppError::Validation(msg)
            | AppError::Ocr(msg)
            | AppError::Llm(msg)
            | AppError::Session(msg)
            | AppError::Network(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::ocr_errors::OcrError> for AppError {
    fn from(err: crate::ocr_errors::OcrError) -> Self {
        AppError::Ocr(err.user_message())
    }
}

impl From<crate::llm::LlmError> for AppError {
    fn from(err: crate::llm::LlmError) -> Self {
        match err {
            crate::llm::LlmError::Transport(msg) => AppError::Network(msg),
            other => AppError::Llm(other.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log OCR processing errors with image and processing context
    pub fn log_ocr_error(
        error: &impl std::fmt::Display,
        operation: &str,
        language: Option<&str>,
        image_size: Option<u64>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            language = ?language,
            image_size_bytes = ?image_size,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "OCR processing failed"
        );
    }

    /// Log chat-completion provider errors with provider context
    pub fn log_llm_error(
        error: &impl std::fmt::Display,
        operation: &str,
        provider: &str,
        status: Option<u16>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            provider = %provider,
            status = ?status,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Chat completion failed"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        session_id: Option<&str>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            session_id = ?session_id,
            input_type = %input_type,
            input_value = ?input_value.map(truncate_for_log),
            "Validation failed"
        );
    }

    /// Log session store errors
    pub fn log_session_error(error: &impl std::fmt::Display, operation: &str, session_id: Option<&str>) {
        error!(
            error = %error,
            operation = %operation,
            session_id = ?session_id,
            "Session operation failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }

    fn truncate_for_log(value: &str) -> String {
        if value.chars().count() > 100 {
            format!("{}...", value.chars().take(100).collect::<String>())
        } else {
            value.to_string()
        }
    }
}

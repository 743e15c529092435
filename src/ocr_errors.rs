//! # OCR Error Types Module
//!
//! This module defines custom error types used throughout the OCR processing system.
//! It provides structured error handling for various OCR operations and failure modes.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Upload validation errors (empty, unsupported format, too large)
    Validation(String),
    /// OCR engine initialization errors
    Initialization(String),
    /// Image decoding and preprocessing errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Timeout errors
    Timeout(String),
}

impl OcrError {
    fn tag(&self) -> &'static str {
        match self {
            OcrError::Validation(_) => "VALIDATION",
            OcrError::Initialization(_) => "OCR_INIT",
            OcrError::ImageLoad(_) => "IMAGE_LOAD",
            OcrError::Extraction(_) => "OCR_EXTRACT",
            OcrError::Timeout(_) => "OCR_TIMEOUT",
        }
    }

    /// Message without the category tag
    pub fn user_message(&self) -> String {
        match self {
            OcrError::Validation(msg) => format!("Image validation failed: {}", msg),
            OcrError::Initialization(msg) => format!("OCR engine initialization failed: {}", msg),
            OcrError::ImageLoad(msg) => format!("Failed to load image for OCR processing: {}", msg),
            OcrError::Extraction(msg) => format!("Text extraction from image failed: {}", msg),
            OcrError::Timeout(msg) => format!("OCR processing timed out: {}", msg),
        }
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.tag(), self.user_message())
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}

//! # SmartScript
//!
//! A web demo that reads handwritten or printed documents in English, Hindi
//! and Arabic with offline OCR, optionally cleans the text up through a
//! chat-completion provider, and answers questions about the result.

pub mod analysis;
pub mod config;
pub mod enhancement;
pub mod errors;
pub mod instance_manager;
pub mod language;
pub mod llm;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod qa;
pub mod session;
pub mod web;

// Re-export types for easier access
pub use errors::{AppError, AppResult};
pub use language::{Language, ProcessingMode};

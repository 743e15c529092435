//! # OCR Processing Module
//!
//! This module provides optical character recognition (OCR) functionality for
//! extracting handwritten text from uploaded images.
//!
//! ## Pipeline
//!
//! ```text
//! upload bytes ─► validate (format, size) ─► decode ─► grayscale? ─► PNG
//!                                                                     │
//!        OcrOutcome ◄── clean text, clamp confidence ◄── recognizer ◄─┘
//! ```
//!
//! ## Supported Image Formats
//!
//! - PNG (Portable Network Graphics) - up to 15MB
//! - JPEG/JPG (Joint Photographic Experts Group) - up to 10MB
//!
//! Both are further capped by the general upload limit.
//!
//! ## Failure Handling
//!
//! Recognition is attempted once. Any failure is returned as an [`OcrError`]
//! for the caller to show to the user; there is no retry.

use image::{DynamicImage, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::errors::error_logging;
use crate::instance_manager::OcrInstanceManager;
use crate::language::Language;
use crate::observability;
use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;

lazy_static! {
    static ref INLINE_WHITESPACE: Regex = Regex::new(r"[ \t\x{00A0}]{2,}").expect("valid regex");
}

/// Text and confidence extracted from one image
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    /// Cleaned text (may be empty when nothing was recognized)
    pub text: String,
    /// Confidence percentage in `[0, 100]`, two decimals
    pub confidence: f32,
    /// Time spent inside the recognizer
    pub ocr_duration: Duration,
}

/// Detect the upload format from its magic bytes
pub fn detect_image_format(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, OcrError> {
    if bytes.len() < config.min_format_bytes {
        return Err(OcrError::Validation(format!(
            "not enough data to determine image format (read {} bytes, need at least {})",
            bytes.len(),
            config.min_format_bytes
        )));
    }

    let header = &bytes[..bytes.len().min(config.buffer_size)];
    image::guess_format(header)
        .map_err(|e| OcrError::Validation(format!("could not determine image format: {e}")))
}

/// Validate an uploaded image and return its detected format
///
/// # Validation Checks
///
/// | Check | Error |
/// |-------|-------|
/// | empty upload | `Validation` |
/// | larger than the general limit | `Validation` |
/// | not PNG or JPEG | `Validation` |
/// | larger than the format limit | `Validation` |
pub fn validate_image_bytes(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::Validation("uploaded file is empty".to_string()));
    }

    let size = bytes.len() as u64;
    if size > config.max_file_size {
        return Err(OcrError::Validation(format!(
            "file too large ({} bytes, maximum allowed: {} bytes)",
            size, config.max_file_size
        )));
    }

    let format = detect_image_format(bytes, config)?;
    let format_limit = match format {
        ImageFormat::Png => config.format_limits.png_max,
        ImageFormat::Jpeg => config.format_limits.jpeg_max,
        other => {
            info!("Rejected upload with unsupported format {other:?}");
            return Err(OcrError::Validation(format!(
                "unsupported image format {other:?}; please upload a PNG or JPEG"
            )));
        }
    };

    if size > format_limit {
        return Err(OcrError::Validation(format!(
            "image file too large for {:?} format: {} bytes (maximum allowed: {} bytes)",
            format, size, format_limit
        )));
    }

    debug!(?format, size, "Upload passed validation");
    Ok(format)
}

/// MIME type for an accepted upload format
pub fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        _ => "image/png",
    }
}

/// Decode the upload and re-encode it as PNG for the recognizer
///
/// Colour images are converted to 8-bit luma when `grayscale` is set;
/// images without colour channels pass through unchanged.
pub fn preprocess_image(bytes: &[u8], grayscale: bool) -> Result<Vec<u8>, OcrError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| OcrError::ImageLoad(format!("could not decode image: {e}")))?;

    let prepared = if grayscale && decoded.color().has_color() {
        DynamicImage::ImageLuma8(decoded.to_luma8())
    } else {
        decoded
    };

    let mut png = Vec::new();
    prepared
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::ImageLoad(format!("could not encode image for OCR: {e}")))?;
    Ok(png)
}

/// Remove extra whitespace and empty lines from recognizer output
pub fn clean_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<String>>()
        .join("\n")
}

/// Clamp an engine confidence into `[0, 100]` with two decimals
pub fn normalize_confidence(raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Extract text from an uploaded image
///
/// Validates and preprocesses the upload, then obtains the recognizer for
/// `language` from the manager (initializing it on first use) and runs
/// recognition, both on a blocking thread bounded by `config.operation_timeout_secs`.
///
/// # Errors
///
/// - `Validation` - empty, unsupported or oversized upload
/// - `ImageLoad` - the image could not be decoded
/// - `Initialization` - the engine could not load the language
/// - `Extraction` - recognition failed
/// - `Timeout` - initialization plus recognition exceeded the configured timeout
pub async fn extract_text(
    image_bytes: &[u8],
    language: Language,
    config: &OcrConfig,
    instance_manager: &Arc<OcrInstanceManager>,
) -> Result<OcrOutcome, OcrError> {
    let span = observability::ocr_span("extract_text", language);

    let start_time = Instant::now();
    let image_size = image_bytes.len() as u64;

    let result = run_extraction(image_bytes, language, config, instance_manager)
        .instrument(span)
        .await;
    let total_duration = start_time.elapsed();

    match &result {
        Ok(outcome) => {
            observability::record_ocr_metrics(language, true, total_duration, image_size);
            info!(
                language = language.code(),
                chars = outcome.text.chars().count(),
                confidence = outcome.confidence,
                duration_ms = total_duration.as_millis() as u64,
                "OCR extraction completed"
            );
        }
        Err(err) => {
            observability::record_ocr_metrics(language, false, total_duration, image_size);
            error_logging::log_ocr_error(
                err,
                "extract_text",
                Some(language.code()),
                Some(image_size),
                Some(total_duration),
            );
        }
    }

    result
}

async fn run_extraction(
    image_bytes: &[u8],
    language: Language,
    config: &OcrConfig,
    instance_manager: &Arc<OcrInstanceManager>,
) -> Result<OcrOutcome, OcrError> {
    validate_image_bytes(image_bytes, config)?;

    let owned = image_bytes.to_vec();
    let grayscale = config.grayscale;
    let png = tokio::task::spawn_blocking(move || preprocess_image(&owned, grayscale))
        .await
        .map_err(|e| OcrError::ImageLoad(format!("preprocessing task failed: {e}")))??;

    // Initialization and recognition both run on the blocking pool under the timeout
    let manager = Arc::clone(instance_manager);
    let engine_config = config.clone();
    let ocr_start_time = Instant::now();
    let timeout_duration = Duration::from_secs(config.operation_timeout_secs);
    let recognition = tokio::time::timeout(
        timeout_duration,
        tokio::task::spawn_blocking(move || {
            let instance = manager.get_instance(language, &engine_config)?;
            let mut recognizer = instance.lock();
            recognizer.recognize(&png)
        }),
    )
    .await;
    let ocr_duration = ocr_start_time.elapsed();

    let raw = match recognition {
        Ok(Ok(Ok(raw))) => raw,
        Ok(Ok(Err(e))) => {
            warn!("OCR processing failed after {}ms: {e}", ocr_duration.as_millis());
            return Err(e);
        }
        Ok(Err(join_error)) => {
            return Err(OcrError::Extraction(format!(
                "recognition task failed: {join_error}"
            )));
        }
        Err(_) => {
            warn!(
                "OCR processing timed out after {}ms (limit: {}s)",
                ocr_duration.as_millis(),
                config.operation_timeout_secs
            );
            return Err(OcrError::Timeout(format!(
                "OCR operation timed out after {} seconds",
                config.operation_timeout_secs
            )));
        }
    };

    Ok(OcrOutcome {
        text: clean_text(&raw.text),
        confidence: normalize_confidence(raw.confidence),
        ocr_duration,
    })
}

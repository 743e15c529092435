//! # OCR Configuration Module
//!
//! This module defines configuration structures for OCR processing,
//! including format limits, recognizer options and the recognition timeout.

use crate::errors::{AppError, AppResult};

// Constants for OCR configuration
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for uploads
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Format-specific file size limits for the accepted upload formats
#[derive(Debug, Clone)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 15 * 1024 * 1024,  // 15MB for PNG
            jpeg_max: 10 * 1024 * 1024, // 10MB for JPEG
        }
    }
}

impl FormatSizeLimits {
    /// Validate format size limits
    pub fn validate(&self) -> AppResult<()> {
        if self.png_max == 0 {
            return Err(AppError::Config("png_max must be greater than 0".to_string()));
        }
        if self.jpeg_max == 0 {
            return Err(AppError::Config("jpeg_max must be greater than 0".to_string()));
        }
        if self.jpeg_max > self.png_max {
            return Err(AppError::Config(format!(
                "jpeg_max ({}) should not exceed png_max ({})",
                self.jpeg_max, self.png_max
            )));
        }
        Ok(())
    }
}

/// Page Segmentation Mode for Tesseract OCR
///
/// Only the modes that make sense for a page of handwriting are offered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Find as much text as possible in no particular order
    SparseText = 11,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SparseText => "11",
        }
    }
}

/// Tesseract model type for different accuracy/speed trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelType {
    /// Fast model (tessdata_fast) - faster processing, lower accuracy
    #[default]
    Fast,
    /// Best model (tessdata_best) - slower processing, higher accuracy
    Best,
}

impl ModelType {
    /// Get the tessdata directory name for this model type
    pub fn tessdata_dir(&self) -> &'static str {
        match self {
            ModelType::Fast => "tessdata_fast",
            ModelType::Best => "tessdata_best",
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(ModelType::Fast),
            "best" => Ok(ModelType::Best),
            other => Err(AppError::Config(format!(
                "OCR_MODEL_TYPE must be 'fast' or 'best', got '{}'",
                other
            ))),
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract model type (Fast vs Best accuracy)
    pub model_type: ModelType,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed upload size in bytes (general limit)
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Convert colour images to grayscale before recognition
    pub grayscale: bool,
    /// Default page segmentation mode for OCR
    pub psm_mode: PageSegMode,
    /// Timeout for a single recognition in seconds
    pub operation_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            grayscale: true,
            psm_mode: PageSegMode::default(),
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        // Validate buffer sizes
        if self.buffer_size == 0 {
            return Err(AppError::Config("buffer_size must be greater than 0".to_string()));
        }
        if self.min_format_bytes == 0 {
            return Err(AppError::Config(
                "min_format_bytes must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes > self.buffer_size {
            return Err(AppError::Config(format!(
                "min_format_bytes ({}) cannot exceed buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }

        if self.max_file_size == 0 {
            return Err(AppError::Config("max_file_size must be greater than 0".to_string()));
        }

        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.operation_timeout_secs > 300 {
            return Err(AppError::Config(
                "operation_timeout_secs cannot be greater than 300 seconds".to_string(),
            ));
        }

        self.format_limits.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unused_assignments)]
    fn test_format_size_limits_validation() {
        let mut config = FormatSizeLimits::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        config.png_max = 0;
        assert!(config.validate().is_err());
        config.png_max = 15 * 1024 * 1024;

        config.jpeg_max = 0;
        assert!(config.validate().is_err());
        config.jpeg_max = 10 * 1024 * 1024;

        // jpeg_max > png_max
        config.jpeg_max = 20 * 1024 * 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_ocr_config_validation() {
        let mut config = OcrConfig::default();
        assert!(config.validate().is_ok());

        config.min_format_bytes = 64;
        assert!(config.validate().is_err());
        config.min_format_bytes = MIN_FORMAT_BYTES;

        config.max_file_size = 0;
        assert!(config.validate().is_err());
        config.max_file_size = MAX_FILE_SIZE;

        config.operation_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.operation_timeout_secs = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_type_values() {
        assert_eq!(ModelType::Fast.tessdata_dir(), "tessdata_fast");
        assert_eq!(ModelType::Best.tessdata_dir(), "tessdata_best");
        assert_eq!(ModelType::default(), ModelType::Fast);
        assert_eq!("BEST".parse::<ModelType>().unwrap(), ModelType::Best);
        assert!("medium".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_grayscale_enabled_by_default() {
        assert!(OcrConfig::default().grayscale);
        assert_eq!(PageSegMode::default().as_str(), "3");
    }
}

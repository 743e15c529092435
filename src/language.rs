//! # Document Languages
//!
//! Languages offered in the document language selector, and the codes each one
//! maps to: the two-letter code used for selection and session state, and the
//! Tesseract traineddata name used to initialize the recognizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language a handwritten document can be recognized in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English (`en`)
    #[default]
    English,
    /// Hindi (`hi`)
    Hindi,
    /// Arabic (`ar`)
    Arabic,
}

impl Language {
    /// All languages, in selector order
    pub const ALL: [Language; 3] = [Language::English, Language::Hindi, Language::Arabic];

    /// Two-letter code for this language
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Arabic => "ar",
        }
    }

    /// Tesseract traineddata name for this language
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Hindi => "hin",
            Language::Arabic => "ara",
        }
    }

    /// English display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Arabic => "Arabic",
        }
    }

    /// Name of the language written in the language itself
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "हिन्दी",
            Language::Arabic => "العربية",
        }
    }

    /// Whether the script is written right-to-left
    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Arabic)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = crate::errors::AppError;

    /// Accepts the two-letter code or the English display name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.code().eq_ignore_ascii_case(needle)
                    || lang.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                crate::errors::AppError::Validation(format!("Unsupported language: {}", needle))
            })
    }
}

/// How the extracted text is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// OCR output only
    Traditional,
    /// OCR output rewritten by a chat-completion provider
    #[default]
    #[serde(rename = "genai_enhanced")]
    GenAiEnhanced,
}

impl ProcessingMode {
    /// All modes, in radio-button order
    pub const ALL: [ProcessingMode; 2] = [ProcessingMode::Traditional, ProcessingMode::GenAiEnhanced];

    /// Form value for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Traditional => "traditional",
            ProcessingMode::GenAiEnhanced => "genai_enhanced",
        }
    }

    /// Display label for this mode
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Traditional => "Traditional ML",
            ProcessingMode::GenAiEnhanced => "GenAI Enhanced",
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = crate::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ProcessingMode::ALL
            .into_iter()
            .find(|mode| {
                mode.as_str().eq_ignore_ascii_case(needle) || mode.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| {
                crate::errors::AppError::Validation(format!("Unsupported processing mode: {}", needle))
            })
    }
}

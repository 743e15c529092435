//! # OCR Instance Manager Module
//!
//! This module provides thread-safe management of text recognizers, one per
//! document language. A recognizer is initialized the first time its language
//! is selected and reused for every later analysis in that language.
//!
//! The recognition engine sits behind [`RecognizerFactory`] and [`TextRecognizer`];
//! [`TesseractFactory`] is the production engine built on `leptess`.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::language::Language;
use crate::ocr_config::{ModelType, OcrConfig};
use crate::ocr_errors::OcrError;

/// Raw output of one recognition pass
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Text as reported by the engine, before cleanup
    pub text: String,
    /// Engine-reported mean confidence, nominally 0-100
    pub confidence: f32,
}

/// A recognizer bound to a single language
pub trait TextRecognizer: Send {
    /// Recognize text in a PNG-encoded image
    fn recognize(&mut self, png: &[u8]) -> Result<Recognition, OcrError>;
}

/// Creates recognizers for a given language
pub trait RecognizerFactory: Send + Sync {
    /// Initialize a recognizer for `language`
    fn create(
        &self,
        language: Language,
        config: &OcrConfig,
    ) -> Result<Box<dyn TextRecognizer>, OcrError>;
}

/// Recognizer shared between requests; one request uses it at a time
pub type SharedRecognizer = Arc<Mutex<Box<dyn TextRecognizer>>>;

/// Thread-safe OCR instance manager keyed by document language
///
/// # Instance Lifecycle
///
/// - A recognizer is created on the first request for a language
/// - Later requests for the same language reuse it
/// - Requesting one language never creates or touches another language's recognizer
///
/// # Performance
///
/// - First call for a language: ~100-500ms (Tesseract initialization)
/// - Subsequent calls: a map lookup and an `Arc` clone
pub struct OcrInstanceManager {
    factory: Arc<dyn RecognizerFactory>,
    instances: Mutex<HashMap<Language, SharedRecognizer>>,
}

impl OcrInstanceManager {
    /// Create a manager backed by the given recognizer factory
    pub fn new(factory: Arc<dyn RecognizerFactory>) -> Self {
        Self {
            factory,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Create a manager backed by Tesseract
    pub fn tesseract() -> Self {
        Self::new(Arc::new(TesseractFactory))
    }

    /// Get or create the recognizer for `language`
    ///
    /// Blocks for the engine initialization on first use, so call it from a
    /// blocking thread. The map lock is not held while a recognizer is
    /// created; lookups for other languages proceed meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `OcrError::Initialization` if the engine cannot load the language data.
    pub fn get_instance(
        &self,
        language: Language,
        config: &OcrConfig,
    ) -> Result<SharedRecognizer, OcrError> {
        if let Some(instance) = self.instances.lock().get(&language) {
            return Ok(Arc::clone(instance));
        }

        info!(
            language = language.code(),
            model = config.model_type.tessdata_dir(),
            "Initializing OCR recognizer"
        );
        let recognizer = self.factory.create(language, config)?;

        // A concurrent request may have won the race; keep the first one
        let mut instances = self.instances.lock();
        let instance = instances
            .entry(language)
            .or_insert_with(|| Arc::new(Mutex::new(recognizer)));
        Ok(Arc::clone(instance))
    }

    /// Whether a recognizer for `language` has been initialized
    pub fn has_instance(&self, language: Language) -> bool {
        self.instances.lock().contains_key(&language)
    }

    /// Get the number of initialized recognizers
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Check that the engine can initialize a recognizer, without caching it
    pub fn probe(&self, language: Language, config: &OcrConfig) -> Result<(), OcrError> {
        self.factory.create(language, config).map(|_| ())
    }
}

/// Tesseract-backed recognizer factory
#[derive(Debug, Default, Clone, Copy)]
pub struct TesseractFactory;

impl RecognizerFactory for TesseractFactory {
    fn create(
        &self,
        language: Language,
        config: &OcrConfig,
    ) -> Result<Box<dyn TextRecognizer>, OcrError> {
        let tessdata_path = get_tessdata_path(config.model_type);

        let mut tess = LepTess::new(tessdata_path.as_deref(), language.tesseract_code())
            .map_err(|e| {
                OcrError::Initialization(format!(
                    "Failed to initialize Tesseract for '{}': {}",
                    language.tesseract_code(),
                    e
                ))
            })?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| OcrError::Initialization(format!("Failed to set PSM mode: {}", e)))?;

        Ok(Box::new(TesseractRecognizer { tess }))
    }
}

struct TesseractRecognizer {
    tess: LepTess,
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, png: &[u8]) -> Result<Recognition, OcrError> {
        self.tess
            .set_image_from_mem(png)
            .map_err(|e| OcrError::ImageLoad(format!("Failed to load image for OCR: {e}")))?;

        let text = self.tess.get_utf8_text().map_err(|e| {
            OcrError::Extraction(format!("Failed to extract text from image: {e}"))
        })?;

        #[allow(clippy::cast_precision_loss)]
        let confidence = self.tess.mean_text_conf() as f32;

        Ok(Recognition { text, confidence })
    }
}

/// Get the tessdata path for the specified model type
///
/// Falls back to the engine default when no model-specific directory exists.
fn get_tessdata_path(model_type: ModelType) -> Option<String> {
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        if std::path::Path::new(&prefix).exists() {
            return Some(prefix);
        }
    }

    let possible_paths = match model_type {
        ModelType::Fast => [
            "/usr/share/tesseract-ocr/5/tessdata_fast",
            "/usr/share/tesseract-ocr/4.00/tessdata_fast",
            "/usr/share/tessdata_fast",
            "/usr/local/share/tessdata_fast",
        ],
        ModelType::Best => [
            "/usr/share/tesseract-ocr/5/tessdata_best",
            "/usr/share/tesseract-ocr/4.00/tessdata_best",
            "/usr/share/tessdata_best",
            "/usr/local/share/tessdata_best",
        ],
    };

    for path in possible_paths {
        if std::path::Path::new(path).exists() {
            info!("Using tessdata path: {}", path);
            return Some(path.to_string());
        }
    }

    info!(
        "No specific tessdata path found for model type {:?}, using default",
        model_type
    );
    None
}

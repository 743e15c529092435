//! # Localization
//!
//! UI strings for the web page in English, Hindi and Arabic, backed by Fluent
//! bundles compiled into the binary.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LOCALE: &str = "en";

const LOCALES: [(&str, &str); 3] = [
    ("en", include_str!("../locales/en/main.ftl")),
    ("hi", include_str!("../locales/hi/main.ftl")),
    ("ar", include_str!("../locales/ar/main.ftl")),
];

/// Localization manager for the web UI
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled locale
    ///
    /// # Errors
    ///
    /// Fails if a locale identifier or resource cannot be parsed.
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (locale_str, source) in LOCALES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            let bundle = Self::create_bundle(locale, source)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Markup carries its own dir attributes
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid {} resource: {:?}", locale, errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate {} messages: {:?}", locale, errors))?;

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    ///
    /// Unknown languages fall back to English; unknown keys render as
    /// `Missing translation: <key>`.
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LOCALE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let Some(msg) = bundle.get_message(key) else {
            return format!("Missing translation: {}", key);
        };

        let Some(pattern) = msg.value() else {
            return format!("Missing value for key: {}", key);
        };

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }

    /// Get a localized message with arguments in a specific language
    pub fn get_message_with_args_in_language(
        &self,
        key: &str,
        language: &str,
        args: &[(&str, &str)],
    ) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }
}

/// Create the shared localization manager
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}

fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Pick the UI language
///
/// An explicit `?ui=` choice wins; otherwise the highest-weighted supported
/// entry of the `Accept-Language` header is used, then English.
pub fn detect_language(explicit: Option<&str>, accept_language: Option<&str>) -> &'static str {
    if let Some(locale) = explicit.and_then(|tag| supported_locale(&primary_subtag(tag))) {
        return locale;
    }

    let Some(header) = accept_language else {
        return DEFAULT_LOCALE;
    };

    let mut candidates: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = primary_subtag(parts.next()?);
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (!tag.is_empty() && weight > 0.0).then_some((tag, weight))
        })
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    candidates
        .iter()
        .find_map(|(tag, _)| supported_locale(tag))
        .unwrap_or(DEFAULT_LOCALE)
}

fn supported_locale(tag: &str) -> Option<&'static str> {
    LOCALES
        .iter()
        .map(|(locale, _)| *locale)
        .find(|locale| *locale == tag)
}

/// Whether a UI locale is written right-to-left
pub fn is_rtl(locale: &str) -> bool {
    locale == "ar"
}

//! # Unified Application Configuration
//!
//! Centralizes all application settings into one structured configuration
//! object loaded from environment variables (optionally seeded from `.env`),
//! with per-section validation.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{ModelType, OcrConfig};
use crate::qa::DEFAULT_QA_MODEL;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Credentials and endpoints for the chat-completion providers
#[derive(Clone, Default)]
pub struct ProvidersConfig {
    /// Key for the fallback enhancement provider and Q&A
    pub openai_api_key: String,
    /// Model for fallback enhancement
    pub openai_model: String,
    /// Base URL of the OpenAI-compatible API
    pub openai_base_url: String,
    /// Model for question answering
    pub qa_model: String,
    /// Key for the primary enhancement endpoint
    pub xai_api_key: String,
    /// Full URL of the primary enhancement endpoint
    pub xai_api_url: String,
    /// Model sent to the primary endpoint, if any
    pub xai_model: Option<String>,
}

impl fmt::Debug for ProvidersConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidersConfig")
            .field("openai_api_key", &"[REDACTED]")
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("qa_model", &self.qa_model)
            .field("xai_api_key", &"[REDACTED]")
            .field("xai_api_url", &self.xai_api_url)
            .field("xai_model", &self.xai_model)
            .finish()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl ProvidersConfig {
    /// Validate provider configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.openai_api_key.trim().is_empty() {
            return Err(AppError::Config("OPENAI_API_KEY cannot be empty".to_string()));
        }
        if self.openai_model.trim().is_empty() {
            return Err(AppError::Config("OPENAI_MODEL cannot be empty".to_string()));
        }
        if !is_http_url(&self.openai_base_url) {
            return Err(AppError::Config(format!(
                "OPENAI_BASE_URL must start with http:// or https://, got '{}'",
                self.openai_base_url
            )));
        }
        if self.qa_model.trim().is_empty() {
            return Err(AppError::Config("QA_MODEL cannot be empty".to_string()));
        }
        if self.xai_api_key.trim().is_empty() {
            return Err(AppError::Config("XAI_API_KEY cannot be empty".to_string()));
        }
        if !is_http_url(&self.xai_api_url) {
            return Err(AppError::Config(format!(
                "XAI_API_URL must start with http:// or https://, got '{}'",
                self.xai_api_url
            )));
        }
        Ok(())
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds for chat-completion calls
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate HTTP client configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }
        if self.timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface the UI server binds to
    pub host: String,
    /// UI server port
    pub port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Address string for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("SERVER_HOST cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(AppError::Config("SERVER_PORT cannot be 0".to_string()));
        }
        if !self.allow_privileged_ports && self.port < 1024 {
            return Err(AppError::Config(format!(
                "Server port {} is privileged. Set ALLOW_PRIVILEGED_PORTS=true or use port >= 1024",
                self.port
            )));
        }
        Ok(())
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped
    pub ttl_secs: u64,
    /// How often expired sessions are swept
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.ttl_secs == 0 {
            return Err(AppError::Config("SESSION_TTL_SECS cannot be 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(AppError::Config(
                "Session sweep interval cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Chat-completion providers
    pub providers: ProvidersConfig,
    /// Outbound HTTP client
    pub http: HttpConfig,
    /// UI server
    pub server: ServerConfig,
    /// Session store
    pub session: SessionConfig,
    /// OCR processing configuration
    pub ocr: OcrConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<String> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} environment variable is required", key)))
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    expected: &str,
) -> AppResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be {}", key, expected))),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.observability = ObservabilityConfig::from_env()?;
        Ok(config)
    }

    /// Load everything except observability settings through `lookup`
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the variable that is missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        config.providers = ProvidersConfig {
            openai_api_key: required(&lookup, "OPENAI_API_KEY")?,
            openai_model: required(&lookup, "OPENAI_MODEL")?,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            qa_model: lookup("QA_MODEL").unwrap_or_else(|| DEFAULT_QA_MODEL.to_string()),
            xai_api_key: required(&lookup, "XAI_API_KEY")?,
            xai_api_url: required(&lookup, "XAI_API_URL")?,
            xai_model: lookup("XAI_MODEL").filter(|model| !model.trim().is_empty()),
        };

        config.http.timeout_secs =
            parse_or(&lookup, "HTTP_CLIENT_TIMEOUT_SECS", 30, "a valid number")?;

        config.server.host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        config.server.port = parse_or(&lookup, "SERVER_PORT", 8501, "a valid port number")?;
        config.server.allow_privileged_ports =
            parse_or(&lookup, "ALLOW_PRIVILEGED_PORTS", false, "true or false")?;

        config.session.ttl_secs = parse_or(&lookup, "SESSION_TTL_SECS", 3600, "a valid number")?;

        config.ocr.grayscale = parse_or(&lookup, "OCR_GRAYSCALE", true, "true or false")?;
        config.ocr.model_type = match lookup("OCR_MODEL_TYPE") {
            Some(raw) => raw.parse::<ModelType>()?,
            None => ModelType::default(),
        };
        config.ocr.operation_timeout_secs =
            parse_or(&lookup, "OCR_TIMEOUT_SECS", 30, "a valid number")?;

        config.observability.metrics_port =
            parse_or(&lookup, "METRICS_PORT", 9090, "a valid port number")?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.providers.validate()?;
        self.http.validate()?;
        self.server.validate()?;
        self.session.validate()?;
        self.ocr.validate()?;
        self.observability.validate()?;

        if self.observability.enable_metrics_export
            && self.server.port == self.observability.metrics_port
        {
            return Err(AppError::Config(
                "Server port and metrics port cannot be the same".to_string(),
            ));
        }
        if !self.server.allow_privileged_ports && self.observability.metrics_port < 1024 {
            return Err(AppError::Config(format!(
                "Metrics port {} is privileged. Set ALLOW_PRIVILEGED_PORTS=true or use port >= 1024",
                self.observability.metrics_port
            )));
        }

        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: openai_api_key=[REDACTED], xai_api_key=[REDACTED], openai_model={}, qa_model={}, xai_url={}, bind={}, metrics_port={}, session_ttl={}s, ocr_model={}, grayscale={}, http_timeout={}s",
            self.providers.openai_model,
            self.providers.qa_model,
            self.providers.xai_api_url,
            self.server.bind_address(),
            self.observability.metrics_port,
            self.session.ttl_secs,
            self.ocr.model_type.tessdata_dir(),
            self.ocr.grayscale,
            self.http.timeout_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_MODEL", "gpt-4o"),
        ("XAI_API_KEY", "xai-test"),
        ("XAI_API_URL", "https://api.x.ai/v1/chat/completions"),
    ];

    #[test]
    fn test_defaults_with_required_vars() {
        let config = AppConfig::from_lookup(vars(&REQUIRED)).unwrap();
        assert_eq!(config.providers.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.providers.qa_model, "gpt-4o-mini");
        assert_eq!(config.providers.xai_model, None);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8501");
        assert_eq!(config.session.ttl_secs, 3600);
        assert!(config.ocr.grayscale);
        assert_eq!(config.ocr.model_type, ModelType::Fast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_var_is_named() {
        let err = AppConfig::from_lookup(vars(&REQUIRED[..3])).unwrap_err();
        assert!(err.to_string().contains("XAI_API_URL"));
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SERVER_PORT", "eighty"));
        let err = AppConfig::from_lookup(vars(&pairs)).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OCR_MODEL_TYPE", "huge"));
        assert!(AppConfig::from_lookup(vars(&pairs)).is_err());
    }

    #[test]
    fn test_overrides_are_applied() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("XAI_MODEL", "grok-2"),
            ("QA_MODEL", "gpt-4.1-mini"),
            ("OCR_GRAYSCALE", "false"),
            ("OCR_MODEL_TYPE", "best"),
            ("SESSION_TTL_SECS", "120"),
            ("HTTP_CLIENT_TIMEOUT_SECS", "10"),
        ]);
        let config = AppConfig::from_lookup(vars(&pairs)).unwrap();
        assert_eq!(config.providers.xai_model.as_deref(), Some("grok-2"));
        assert_eq!(config.providers.qa_model, "gpt-4.1-mini");
        assert!(!config.ocr.grayscale);
        assert_eq!(config.ocr.model_type, ModelType::Best);
        assert_eq!(config.session.ttl(), Duration::from_secs(120));
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_provider_validation() {
        let mut config = AppConfig::from_lookup(vars(&REQUIRED)).unwrap().providers;
        assert!(config.validate().is_ok());

        config.xai_api_url = "api.x.ai".to_string();
        assert!(config.validate().is_err());
        config.xai_api_url = "https://api.x.ai/v1/chat/completions".to_string();

        config.openai_base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.openai_base_url = DEFAULT_OPENAI_BASE_URL.to_string();

        config.openai_api_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_config_validation() {
        let mut config = HttpConfig::default();
        assert!(config.validate().is_ok());

        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.timeout_secs = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.port = 80;
        assert!(config.validate().is_err());

        config.allow_privileged_ports = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_clash_is_rejected() {
        let mut config = AppConfig::from_lookup(vars(&REQUIRED)).unwrap();
        config.server.port = config.observability.metrics_port;
        assert!(config.validate().is_err());

        config.observability.enable_metrics_export = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_summary_redacts_keys() {
        let config = AppConfig::from_lookup(vars(&REQUIRED)).unwrap();
        let summary = config.summary();
        assert!(!summary.contains("sk-test"));
        assert!(!summary.contains("xai-test"));
        assert!(summary.contains("[REDACTED]"));

        let debug = format!("{:?}", config.providers);
        assert!(!debug.contains("sk-test"));
    }
}

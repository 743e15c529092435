//! # Observability Configuration
//!
//! Environment-specific settings for logging, metrics export and trace export.

use std::env;

use crate::errors::{AppError, AppResult};

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// OTLP endpoint for trace export
    pub otlp_endpoint: Option<String>,
    /// Prometheus metrics endpoint port
    pub metrics_port: u16,
    /// Log level for the application's own targets
    pub log_level: String,
    /// Whether to enable trace sampling
    pub enable_trace_sampling: bool,
    /// Trace sampling ratio (0.0-1.0)
    pub trace_sampling_ratio: f64,
    /// Whether to start the Prometheus exporter and metrics server
    pub enable_metrics_export: bool,
    /// Resource attributes attached to exported traces
    pub tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            otlp_endpoint: None,
            metrics_port: 9090,
            log_level: "info".to_string(),
            enable_trace_sampling: false,
            trace_sampling_ratio: 1.0,
            enable_metrics_export: true,
            tags: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a numeric or boolean variable cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.trim().is_empty()),
            metrics_port: env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("METRICS_PORT must be a valid port number".to_string())
                })?,
            log_level: env::var("OBSERVABILITY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            enable_trace_sampling: env::var("ENABLE_TRACE_SAMPLING")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("ENABLE_TRACE_SAMPLING must be true or false".to_string())
                })?,
            trace_sampling_ratio: env::var("TRACE_SAMPLING_RATIO")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("TRACE_SAMPLING_RATIO must be a number".to_string())
                })?,
            enable_metrics_export: env::var("ENABLE_METRICS_EXPORT")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| {
                    AppError::Config("ENABLE_METRICS_EXPORT must be true or false".to_string())
                })?,
            tags: env::var("OBSERVABILITY_TAGS")
                .map(|raw| parse_tags(&raw))
                .unwrap_or_default(),
        };
        config.add_default_tags();
        Ok(config)
    }

    fn add_default_tags(&mut self) {
        self.tags
            .push(("environment".to_string(), self.environment.clone()));
        self.tags
            .push(("service".to_string(), env!("CARGO_PKG_NAME").to_string()));
        self.tags
            .push(("version".to_string(), env!("CARGO_PKG_VERSION").to_string()));
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(AppError::Config(format!(
                    "Invalid OTLP endpoint format: {}",
                    endpoint
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.trace_sampling_ratio) {
            return Err(AppError::Config(format!(
                "Invalid trace sampling ratio: {}",
                self.trace_sampling_ratio
            )));
        }

        if self.metrics_port == 0 {
            return Err(AppError::Config(format!(
                "Invalid metrics port: {}",
                self.metrics_port
            )));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(AppError::Config(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Parse tags from an environment variable string
/// Format: "key1=value1,key2=value2,key3=value3"
fn parse_tags(tags_str: &str) -> Vec<(String, String)> {
    tags_str
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if !key.trim().is_empty() => {
                    Some((key.trim().to_string(), value.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Environment-specific configuration presets
pub mod presets {
    use super::ObservabilityConfig;

    /// Development configuration with full observability
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            enable_trace_sampling: false,
            trace_sampling_ratio: 1.0,
            enable_metrics_export: true,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Staging configuration with moderate observability
    pub fn staging() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "staging".to_string(),
            enable_trace_sampling: true,
            trace_sampling_ratio: 0.5,
            enable_metrics_export: true,
            log_level: "info".to_string(),
            ..Default::default()
        }
    }

    /// Production configuration
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            enable_trace_sampling: true,
            trace_sampling_ratio: 0.1,
            enable_metrics_export: true,
            log_level: "warn".to_string(),
            ..Default::default()
        }
    }

    /// Minimal configuration for resource-constrained environments
    pub fn minimal() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "minimal".to_string(),
            enable_trace_sampling: true,
            trace_sampling_ratio: 0.01,
            enable_metrics_export: false,
            log_level: "error".to_string(),
            ..Default::default()
        }
    }
}

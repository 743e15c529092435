//! Observability module for metrics, tracing and logging setup.
//!
//! This module provides:
//! - Structured logging (pretty in development, JSON elsewhere)
//! - Optional OpenTelemetry trace export over OTLP
//! - Prometheus metrics on a separate port, next to liveness/readiness probes
//! - Span helpers for OCR, chat-completion and web operations

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

use anyhow::Result;

use crate::observability_config::ObservabilityConfig;

pub use health_checks::{perform_readiness_checks, ReadinessContext};
pub use metrics::{
    record_active_sessions, record_analysis_metrics, record_health_check_metrics,
    record_llm_metrics, record_ocr_metrics, record_request_metrics,
};
pub use tracing_mod::{llm_span, ocr_span, web_span, TracingGuard};

/// Initialize logging, trace export and, when enabled, the metrics server
///
/// The returned guard flushes exported spans when dropped.
///
/// # Errors
///
/// Fails if a subscriber is already installed, the OTLP exporter cannot be
/// built, or the metrics port cannot be bound.
pub async fn init_observability(
    config: &ObservabilityConfig,
    readiness: ReadinessContext,
) -> Result<TracingGuard> {
    let guard = tracing_mod::init_tracing_with_config(config)?;

    if config.enable_metrics_export {
        let handle = metrics::init_metrics_with_config(config)?;
        metrics::start_metrics_server(handle, config.metrics_port, readiness).await?;
    } else {
        tracing::info!("Metrics export disabled");
    }

    tracing::info!("Observability initialized");
    Ok(guard)
}

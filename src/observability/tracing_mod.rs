//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - OpenTelemetry distributed tracing
//! - Tracing span creation utilities

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use crate::language::Language;
use crate::observability_config::ObservabilityConfig;

const TRACER_NAME: &str = "smartscript";

/// Flushes and shuts down the OTLP tracer provider on drop
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    /// Whether spans are being exported over OTLP
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {:?}", e);
            }
        }
    }
}

/// Build the log filter: `RUST_LOG` first, then the configured level for this crate
fn build_filter(config: &ObservabilityConfig) -> Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("smartscript={}", config.log_level).parse()?)
        .add_directive("tower_http=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if let Ok(web_log) = std::env::var("WEB_LOG_LEVEL") {
        filter = filter.add_directive(format!("smartscript::web={}", web_log).parse()?);
    }

    Ok(filter)
}

/// Build the OTLP tracer provider
///
/// Returns `None` unless an OTLP endpoint is configured.
pub fn build_tracer_provider(config: &ObservabilityConfig) -> Result<Option<SdkTracerProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        return Ok(None);
    };

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let sampler = if config.enable_trace_sampling {
        Sampler::TraceIdRatioBased(config.trace_sampling_ratio)
    } else {
        Sampler::AlwaysOn
    };

    let resource = Resource::builder()
        .with_service_name(TRACER_NAME)
        .with_attributes(
            config
                .tags
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone())),
        )
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_sampler(sampler)
        .with_resource(resource)
        .build();

    Ok(Some(provider))
}

/// Layer forwarding `tracing` spans to the given OpenTelemetry provider
pub fn otel_layer<S>(provider: &SdkTracerProvider) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME))
}

/// Initialize structured logging and, when an OTLP endpoint is configured,
/// span export through an OpenTelemetry layer
///
/// Keep the returned guard alive for the life of the process.
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let filter = build_filter(config)?;
    let provider = build_tracer_provider(config)?;
    let otel = provider.as_ref().map(otel_layer);

    // Pretty for development, JSON for everything else
    if config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty"
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(otel)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(otel)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );

    match (&provider, &config.otlp_endpoint) {
        (Some(provider), Some(endpoint)) => {
            global::set_tracer_provider(provider.clone());
            tracing::info!(
                otlp_endpoint = %endpoint,
                trace_sampling_enabled = %config.enable_trace_sampling,
                trace_sampling_ratio = %config.trace_sampling_ratio,
                "OpenTelemetry tracing initialized with OTLP export"
            );
        }
        _ => tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)"),
    }

    Ok(TracingGuard { provider })
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str, language: Language) -> tracing::Span {
    tracing::info_span!(
        "ocr_operation",
        operation = operation,
        language = language.code(),
        component = "ocr"
    )
}

/// Create a span for chat-completion calls
pub fn llm_span(operation: &str, provider: &str) -> tracing::Span {
    tracing::info_span!(
        "llm_operation",
        operation = operation,
        provider = provider,
        component = "llm"
    )
}

/// Create a span for web requests bound to a session
pub fn web_span(route: &str, session_id: &uuid::Uuid) -> tracing::Span {
    tracing::info_span!(
        "web_operation",
        route = route,
        session_id = %session_id,
        component = "web"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_configured_level() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_filter_rejects_garbage_level() {
        let config = ObservabilityConfig {
            log_level: "not a level!".to_string(),
            ..Default::default()
        };
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_no_tracer_provider_without_endpoint() {
        let config = ObservabilityConfig {
            otlp_endpoint: None,
            ..Default::default()
        };
        assert!(build_tracer_provider(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tracer_provider_built_for_endpoint() {
        let config = ObservabilityConfig {
            otlp_endpoint: Some("http://localhost:4317".to_string()),
            enable_trace_sampling: false,
            ..Default::default()
        };
        let provider = build_tracer_provider(&config).unwrap();
        assert!(provider.is_some());

        let guard = TracingGuard { provider };
        assert!(guard.is_exporting());
    }

    #[test]
    fn test_spans_reach_opentelemetry_through_layer() {
        use opentelemetry::trace::TraceContextExt;
        use tracing_opentelemetry::OpenTelemetrySpanExt;

        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry().with(otel_layer(&provider));

        tracing::subscriber::with_default(subscriber, || {
            let span = ocr_span("extract_text", Language::Hindi);
            let _entered = span.enter();
            let context = tracing::Span::current().context();
            assert!(context.span().span_context().is_valid());
        });
    }
}

//! Health check functionality module.
//!
//! This module provides:
//! - OCR engine availability checks
//! - Chat-completion provider configuration checks
//! - Combined readiness checks with a cached OCR probe
//! - A periodic health metrics recorder that refreshes the probe

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ProvidersConfig;
use crate::instance_manager::OcrInstanceManager;
use crate::language::Language;
use crate::ocr_config::OcrConfig;

/// How long a probe result answers readiness requests before the engine is probed again
pub const DEFAULT_OCR_PROBE_TTL: Duration = Duration::from_secs(30);

/// Outcome of the last OCR engine probe
#[derive(Debug, Clone)]
struct OcrProbe {
    checked_at: Instant,
    error: Option<String>,
}

impl OcrProbe {
    fn outcome(&self) -> Result<()> {
        match &self.error {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

/// Everything the readiness probe needs to look at
#[derive(Clone)]
pub struct ReadinessContext {
    pub ocr_manager: Arc<OcrInstanceManager>,
    pub ocr_config: OcrConfig,
    pub providers: ProvidersConfig,
    ocr_probe_ttl: Duration,
    last_ocr_probe: Arc<tokio::sync::Mutex<Option<OcrProbe>>>,
}

impl ReadinessContext {
    pub fn new(
        ocr_manager: Arc<OcrInstanceManager>,
        ocr_config: OcrConfig,
        providers: ProvidersConfig,
    ) -> Self {
        Self {
            ocr_manager,
            ocr_config,
            providers,
            ocr_probe_ttl: DEFAULT_OCR_PROBE_TTL,
            last_ocr_probe: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Override how long a probe result is reused
    pub fn with_ocr_probe_ttl(mut self, ttl: Duration) -> Self {
        self.ocr_probe_ttl = ttl;
        self
    }
}

/// Perform all readiness checks
///
/// The OCR engine is probed at most once per probe TTL; requests in between
/// get the last result.
pub async fn perform_readiness_checks(context: &ReadinessContext) -> Result<()> {
    check_ocr_health_cached(context).await?;
    check_provider_health(&context.providers)?;
    Ok(())
}

/// OCR health, reusing the last probe while it is fresh
pub async fn check_ocr_health_cached(context: &ReadinessContext) -> Result<()> {
    // Held across the probe so concurrent requests wait for one result
    let mut last = context.last_ocr_probe.lock().await;
    if let Some(probe) = last.as_ref() {
        if probe.checked_at.elapsed() < context.ocr_probe_ttl {
            return probe.outcome();
        }
    }

    let probe = run_ocr_probe(context).await;
    let outcome = probe.outcome();
    *last = Some(probe);
    outcome
}

/// Probe the OCR engine now and store the result for readiness requests
pub async fn refresh_ocr_health(context: &ReadinessContext) -> Result<()> {
    let mut last = context.last_ocr_probe.lock().await;
    let probe = run_ocr_probe(context).await;
    let outcome = probe.outcome();
    *last = Some(probe);
    outcome
}

async fn run_ocr_probe(context: &ReadinessContext) -> OcrProbe {
    let result = check_ocr_health(&context.ocr_manager, &context.ocr_config).await;
    OcrProbe {
        checked_at: Instant::now(),
        error: result.err().map(|e| e.to_string()),
    }
}

/// Check that the OCR engine can initialize the default language
///
/// The probe recognizer is created and dropped; the manager's cache is not touched.
pub async fn check_ocr_health(manager: &Arc<OcrInstanceManager>, config: &OcrConfig) -> Result<()> {
    let manager = Arc::clone(manager);
    let config = config.clone();
    tokio::task::spawn_blocking(move || manager.probe(Language::default(), &config))
        .await
        .map_err(|e| anyhow::anyhow!("OCR health check task failed: {}", e))?
        .map_err(|e| anyhow::anyhow!("OCR health check failed: {}", e))?;

    tracing::debug!("OCR health check passed");
    Ok(())
}

/// Check that both enhancement providers and the Q&A model are configured
///
/// No request is sent; a configured provider may still be unreachable.
pub fn check_provider_health(providers: &ProvidersConfig) -> Result<()> {
    providers
        .validate()
        .map_err(|e| anyhow::anyhow!("Provider health check failed: {}", e))?;

    tracing::debug!("Provider health check passed");
    Ok(())
}

/// Start a background task to periodically record health check metrics
pub fn start_health_metrics_recorder(
    context: ReadinessContext,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;

            let check_start = Instant::now();
            let ocr_healthy = refresh_ocr_health(&context).await.is_ok();
            super::record_health_check_metrics("ocr", ocr_healthy, check_start.elapsed());

            let check_start = Instant::now();
            let providers_healthy = check_provider_health(&context.providers).is_ok();
            super::record_health_check_metrics(
                "llm_providers",
                providers_healthy,
                check_start.elapsed(),
            );
        }
    })
}

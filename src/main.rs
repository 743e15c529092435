use anyhow::Result;
use smartscript::analysis::Analyzer;
use smartscript::config::AppConfig;
use smartscript::enhancement::TextEnhancer;
use smartscript::errors::error_logging;
use smartscript::instance_manager::OcrInstanceManager;
use smartscript::llm::{build_http_client, ChatCompletionProvider, OpenAiProvider, XaiProvider};
use smartscript::localization;
use smartscript::observability::{self, health_checks, ReadinessContext};
use smartscript::qa::QuestionAnswerer;
use smartscript::session::SessionStore;
use smartscript::web::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(60);

/// Load and validate configuration at startup
fn load_configuration() -> Result<AppConfig> {
    let config = AppConfig::from_env().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "load_configuration");
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    config.validate().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "validate_configuration");
        anyhow::anyhow!(
            "Configuration validation failed: {}. Please check your environment variables.",
            e
        )
    })?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = load_configuration()?;

    let ocr_manager = Arc::new(OcrInstanceManager::tesseract());
    let readiness = ReadinessContext::new(
        Arc::clone(&ocr_manager),
        config.ocr.clone(),
        config.providers.clone(),
    );

    let _tracing_guard =
        observability::init_observability(&config.observability, readiness.clone()).await?;
    info!("{}", config.summary());

    let _health_metrics_handle =
        health_checks::start_health_metrics_recorder(readiness.clone(), HEALTH_METRICS_INTERVAL);

    let client = build_http_client(config.http.timeout())?;
    let providers = &config.providers;

    let primary: Arc<dyn ChatCompletionProvider> = Arc::new(
        XaiProvider::new(client.clone(), &providers.xai_api_key, &providers.xai_api_url)
            .with_model(providers.xai_model.clone()),
    );
    let fallback: Arc<dyn ChatCompletionProvider> = Arc::new(
        OpenAiProvider::new(client.clone(), &providers.openai_api_key, &providers.openai_model)
            .with_base_url(&providers.openai_base_url),
    );
    let qa_provider: Arc<dyn ChatCompletionProvider> = Arc::new(
        OpenAiProvider::new(client, &providers.openai_api_key, &providers.qa_model)
            .with_base_url(&providers.openai_base_url),
    );

    let enhancer = Arc::new(TextEnhancer::new(primary, fallback));
    let analyzer = Arc::new(Analyzer::new(
        Arc::clone(&ocr_manager),
        config.ocr.clone(),
        enhancer,
    ));
    let answerer = Arc::new(QuestionAnswerer::new(qa_provider, &providers.qa_model));

    let sessions = Arc::new(SessionStore::new(config.session.ttl()));
    let _sweeper_handle = Arc::clone(&sessions).start_sweeper(config.session.sweep_interval());

    let state = AppState {
        sessions,
        analyzer,
        answerer,
        localization: localization::create_localization_manager()?,
        readiness,
    };

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", address, e))?;
    info!(address = %address, "SmartScript listening");

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Rate limiting for HTTP requests
//! - Authentication for metrics endpoints
//! - Prometheus metrics server setup
//! - Metrics recording functions for OCR, chat completions, requests and sessions

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use super::health_checks::{perform_readiness_checks, ReadinessContext};
use crate::language::{Language, ProcessingMode};
use crate::observability_config::ObservabilityConfig;

const MAX_REQUEST_SIZE: u64 = 1024 * 1024;

/// Simple sliding-window rate limiter keyed by client IP
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_secs,
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.window_secs);

        let mut requests = self.requests.lock();
        // Expire old timestamps for every client and forget idle ones
        requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < window);
            !times.is_empty()
        });

        let client_requests = requests.entry(ip.to_string()).or_default();
        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        client_requests.push(now);
        true
    }

    /// Number of clients with requests inside the current window
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().len()
    }
}

/// Check the bearer token from the Authorization header
///
/// Without a configured token every request is accepted.
pub fn check_auth<B>(req: &hyper::Request<B>, expected_token: Option<&str>) -> bool {
    let expected_token = match expected_token {
        Some(token) if !token.is_empty() => token,
        _ => return true,
    };

    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected_token)
}

/// Check request size limit
pub fn check_request_size<B>(req: &hyper::Request<B>) -> bool {
    match req.headers().get(hyper::header::CONTENT_LENGTH) {
        Some(content_length) => content_length
            .to_str()
            .ok()
            .and_then(|size| size.parse::<u64>().ok())
            .is_some_and(|size| size <= MAX_REQUEST_SIZE),
        None => true,
    }
}

/// Initialize metrics collection with Prometheus exporter and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    tracing::info!(
        metrics_enabled = %config.enable_metrics_export,
        "Metrics collection initialized"
    );
    Ok(handle)
}

fn text_response(status: hyper::StatusCode, body: impl Into<String>) -> hyper::Response<String> {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() = status;
    response
}

/// Start the metrics server with `/metrics`, `/health/live` and `/health/ready`
///
/// Binds to localhost unless `METRICS_BIND_ALL_INTERFACES=true`. Requests are
/// rate limited per client IP and, when `METRICS_AUTH_TOKEN` is set, require
/// a matching bearer token.
pub async fn start_metrics_server(
    metrics_handle: PrometheusHandle,
    port: u16,
    readiness: ReadinessContext,
) -> Result<()> {
    let bind_all = std::env::var("METRICS_BIND_ALL_INTERFACES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);
    let auth_token: Option<Arc<str>> = std::env::var("METRICS_AUTH_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .map(Arc::from);

    let addr = if bind_all {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    };

    tracing::info!(
        "Starting metrics server with health checks on {} (bind_all: {})",
        addr,
        bind_all
    );

    // 10 requests per minute per IP
    let rate_limiter = Arc::new(RateLimiter::new(10, 60));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();
                    let readiness = readiness.clone();
                    let rate_limiter = rate_limiter.clone();
                    let auth_token = auth_token.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let readiness = readiness.clone();
                                let rate_limiter = rate_limiter.clone();
                                let auth_token = auth_token.clone();
                                let peer_ip = peer_addr.ip().to_string();
                                async move {
                                    if !rate_limiter.is_allowed(&peer_ip) {
                                        return Ok::<_, std::convert::Infallible>(text_response(
                                            hyper::StatusCode::TOO_MANY_REQUESTS,
                                            "Rate limit exceeded",
                                        ));
                                    }

                                    if !check_request_size(&req) {
                                        return Ok(text_response(
                                            hyper::StatusCode::PAYLOAD_TOO_LARGE,
                                            "Request too large",
                                        ));
                                    }

                                    if !check_auth(&req, auth_token.as_deref()) {
                                        let mut response = text_response(
                                            hyper::StatusCode::UNAUTHORIZED,
                                            "Unauthorized",
                                        );
                                        response.headers_mut().insert(
                                            hyper::header::WWW_AUTHENTICATE,
                                            hyper::header::HeaderValue::from_static("Bearer"),
                                        );
                                        return Ok(response);
                                    }

                                    match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/metrics") => {
                                            let mut response =
                                                hyper::Response::new(metrics_handle.render());
                                            response.headers_mut().insert(
                                                hyper::header::CONTENT_TYPE,
                                                hyper::header::HeaderValue::from_static(
                                                    "text/plain; version=0.0.4; charset=utf-8",
                                                ),
                                            );
                                            Ok(response)
                                        }
                                        (&hyper::Method::GET, "/health/live") => {
                                            Ok(hyper::Response::new("OK".to_string()))
                                        }
                                        (&hyper::Method::GET, "/health/ready") => {
                                            match perform_readiness_checks(&readiness).await {
                                                Ok(()) => Ok(hyper::Response::new("OK".to_string())),
                                                Err(e) => Ok(text_response(
                                                    hyper::StatusCode::SERVICE_UNAVAILABLE,
                                                    format!("NOT READY: {}", e),
                                                )),
                                            }
                                        }
                                        _ => Ok(text_response(
                                            hyper::StatusCode::NOT_FOUND,
                                            "Not Found",
                                        )),
                                    }
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            crate::errors::error_logging::log_network_error(
                                &err,
                                "serve_http_connection",
                                Some(&peer_addr.to_string()),
                                None,
                            );
                        }
                    });
                }
                Err(e) => {
                    crate::errors::error_logging::log_network_error(
                        &e,
                        "accept_tcp_connection",
                        Some(&addr.to_string()),
                        None,
                    );
                }
            }
        }
    });

    Ok(())
}

/// Record OCR operation metrics
pub fn record_ocr_metrics(language: Language, success: bool, duration: Duration, image_size: u64) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("ocr_operations_total", "language" => language.code(), "result" => result)
        .increment(1);
    metrics::histogram!("ocr_duration_seconds", "language" => language.code())
        .record(duration.as_secs_f64());
    metrics::histogram!("ocr_image_size_bytes").record(image_size as f64);
}

/// Record chat-completion call metrics
pub fn record_llm_metrics(provider: &str, operation: &str, success: bool, duration: Duration) {
    let provider = provider.to_string();
    let operation = operation.to_string();
    let result = if success { "success" } else { "failure" };
    metrics::counter!(
        "llm_requests_total",
        "provider" => provider.clone(),
        "operation" => operation.clone(),
        "result" => result
    )
    .increment(1);
    metrics::histogram!("llm_request_duration_seconds", "provider" => provider, "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record a completed document analysis
pub fn record_analysis_metrics(mode: ProcessingMode, source: &str, processing_secs: f64) {
    let source = source.to_string();
    metrics::counter!("analyses_total", "mode" => mode.as_str(), "source" => source).increment(1);
    metrics::histogram!("analysis_duration_seconds", "mode" => mode.as_str())
        .record(processing_secs);
}

/// Record web request metrics
pub fn record_request_metrics(method: &str, route: &str, status: u16, duration: Duration) {
    let method = method.to_string();
    let route = route.to_string();
    let status = status.to_string();
    metrics::counter!("requests_total", "method" => method, "route" => route.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("request_duration_seconds", "route" => route).record(duration.as_secs_f64());
}

/// Record the number of live sessions
pub fn record_active_sessions(count: usize) {
    metrics::gauge!("active_sessions").set(count as f64);
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    let result = if success { "success" } else { "failure" };
    metrics::counter!("health_checks_total", "type" => check_type.clone(), "result" => result)
        .increment(1);
    metrics::histogram!("health_check_duration_seconds", "type" => check_type.clone())
        .record(duration.as_secs_f64());
    metrics::gauge!("health_check_status", "type" => check_type).set(if success { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> hyper::Request<()> {
        let mut builder = hyper::Request::builder().uri("/metrics");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_rate_limiter_blocks_after_limit() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));
        // Other clients have their own window
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_rate_limiter_forgets_idle_clients() {
        let limiter = RateLimiter::new(5, 0);
        for i in 0..50 {
            assert!(limiter.is_allowed(&format!("10.0.1.{}", i)));
        }
        assert_eq!(limiter.tracked_clients(), 1);

        let limiter = RateLimiter::new(5, 60);
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_auth_without_token_allows_all() {
        assert!(check_auth(&request(&[]), None));
        assert!(check_auth(&request(&[]), Some("")));
    }

    #[test]
    fn test_auth_requires_matching_bearer() {
        assert!(!check_auth(&request(&[]), Some("secret")));
        assert!(!check_auth(&request(&[("authorization", "Bearer nope")]), Some("secret")));
        assert!(!check_auth(&request(&[("authorization", "secret")]), Some("secret")));
        assert!(check_auth(&request(&[("authorization", "Bearer secret")]), Some("secret")));
    }

    #[test]
    fn test_request_size_check() {
        assert!(check_request_size(&request(&[])));
        assert!(check_request_size(&request(&[("content-length", "512")])));
        assert!(!check_request_size(&request(&[("content-length", "2097152")])));
        assert!(!check_request_size(&request(&[("content-length", "lots")])));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_ocr_metrics(Language::Hindi, true, Duration::from_millis(5), 1024);
        record_llm_metrics("xai", "enhance", false, Duration::from_millis(5));
        record_active_sessions(3);
    }
}

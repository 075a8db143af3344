//! Prometheus Metrics Definitions
//!
//! Defines all AppDeck metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<AppdeckMetrics>> = Lazy::new(AppdeckMetrics::new);

/// Container for all AppDeck metrics.
#[derive(Clone)]
pub struct AppdeckMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Rejected credentials - labels: boundary (session/tenant), reason
    pub auth_failures_total: CounterVec,

    /// Invalidation fan-outs applied after writes - labels: mutation
    pub cache_invalidations_total: CounterVec,
}

impl AppdeckMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "appdeck_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register http_requests_total: {}", e))
            })?,

            http_request_duration_seconds: register_histogram_vec!(
                "appdeck_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register http_request_duration_seconds: {}",
                    e
                ))
            })?,

            auth_failures_total: register_counter_vec!(
                "appdeck_auth_failures_total",
                "Total number of rejected credentials",
                &["boundary", "reason"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register auth_failures_total: {}", e))
            })?,

            cache_invalidations_total: register_counter_vec!(
                "appdeck_cache_invalidations_total",
                "Total number of cache invalidation fan-outs",
                &["mutation"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register cache_invalidations_total: {}",
                    e
                ))
            })?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_auth_failure(&self, boundary: &str, reason: &str) {
        self.auth_failures_total
            .with_label_values(&[boundary, reason])
            .inc();
    }

    pub fn record_invalidation(&self, mutation: &str) {
        self.cache_invalidations_total
            .with_label_values(&[mutation])
            .inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

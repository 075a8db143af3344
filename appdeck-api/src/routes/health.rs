//! Health Check Endpoints
//!
//! - /api/v1/health - Liveness with a server timestamp
//! - /api/v1/health/ready - Primary store and cache status
//!
//! No authentication required for health endpoints.

use std::sync::Arc;
use std::time::Instant;

use appdeck_storage::{CacheMode, PrimaryStore};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::cached_store::CachedStore;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: chrono::Utc::now().timestamp(),
        details: None,
    })
}

/// GET /api/v1/health/ready
///
/// 503 only when the primary store is down. A missing cache degrades the
/// service but does not take it out of rotation.
pub async fn readiness(
    State(store): State<Arc<dyn PrimaryStore>>,
    State(cached): State<CachedStore>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let store_health = check_store(store.as_ref()).await;
    let cache_health = match cached.cache_statistics().await.mode {
        CacheMode::Enabled => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: None,
            error: None,
        },
        CacheMode::Disabled => ComponentHealth {
            status: HealthStatus::Degraded,
            latency_ms: None,
            error: Some("cache disabled, serving from primary store".to_string()),
        },
    };

    let overall = match (store_health.status, cache_health.status) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    let response = HealthResponse {
        status: overall,
        timestamp: chrono::Utc::now().timestamp(),
        details: Some(HealthDetails {
            store: store_health,
            cache: cache_health,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

async fn check_store(store: &dyn PrimaryStore) -> ComponentHealth {
    let start = Instant::now();
    match store.ping().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "Primary store health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some("primary store unreachable".to_string()),
            }
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: 1_700_000_000,
            details: None,
        };
        let json = serde_json::to_string(&response)?;
        assert_eq!(json, r#"{"status":"healthy","timestamp":1700000000}"#);
        Ok(())
    }

    #[test]
    fn test_component_health_with_error() -> Result<(), serde_json::Error> {
        let component = ComponentHealth {
            status: HealthStatus::Degraded,
            latency_ms: None,
            error: Some("cache disabled".to_string()),
        };
        let json = serde_json::to_string(&component)?;
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(!json.contains("latency_ms"));
        Ok(())
    }
}

//! System Administration Routes (admin only)
//!
//! Audit log, cache statistics and clearing, and the in-process
//! performance counters. The admin role check is layered on this router
//! in [`super::create_api_router`].

use std::sync::Arc;

use appdeck_core::{AuditAction, AuditLog, EntityKind};
use appdeck_storage::{CacheStatistics, PrimaryStore};
use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::cached_store::CachedStore;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ClientIp, SessionIdentity};
use crate::services::{AuditEntry, AuditRecorder};
use crate::state::AppState;
use crate::telemetry::{PerformanceSnapshot, PerformanceStats};

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<usize>,
}

impl AuditLogQuery {
    fn effective_limit(&self) -> ApiResult<usize> {
        match self.limit {
            None => Ok(DEFAULT_AUDIT_LIMIT),
            Some(limit) if (1..=MAX_AUDIT_LIMIT).contains(&limit) => Ok(limit),
            Some(_) => Err(ApiError::invalid_range("limit", 1, MAX_AUDIT_LIMIT)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/system/audit-logs?limit= - Newest first
pub async fn list_audit_logs(
    State(store): State<Arc<dyn PrimaryStore>>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<AuditLogsResponse>> {
    let limit = query.effective_limit()?;
    let logs = store.list_audit_logs(limit).await?;
    Ok(Json(AuditLogsResponse { logs }))
}

/// GET /api/v1/system/cache/stats
pub async fn cache_stats(State(cached): State<CachedStore>) -> Json<CacheStatistics> {
    Json(cached.cache_statistics().await)
}

/// DELETE /api/v1/system/cache/clear - Drop every key under the prefix
pub async fn clear_cache(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
) -> Json<MessageResponse> {
    cached.clear_cache().await;

    tracing::info!(actor = %actor.subject_id, "Cache cleared");
    audit
        .record(
            AuditEntry::by(&actor, AuditAction::ClearCache, EntityKind::System)
                .ip_address(ip),
        )
        .await;

    Json(MessageResponse {
        message: "Cache cleared".to_string(),
    })
}

/// GET /api/v1/system/performance/stats
pub async fn performance_stats(
    State(performance): State<Arc<PerformanceStats>>,
) -> Json<PerformanceSnapshot> {
    Json(performance.snapshot())
}

/// POST /api/v1/system/performance/reset
pub async fn reset_performance(
    State(performance): State<Arc<PerformanceStats>>,
    SessionIdentity(actor): SessionIdentity,
) -> Json<MessageResponse> {
    performance.reset();
    tracing::info!(actor = %actor.subject_id, "Performance counters reset");
    Json(MessageResponse {
        message: "Performance statistics reset".to_string(),
    })
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(list_audit_logs))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", delete(clear_cache))
        .route("/performance/stats", get(performance_stats))
        .route("/performance/reset", post(reset_performance))
}

//! External API for client applications, authenticated by API key.
//!
//! Every handler is scoped to the application the key resolved to; there
//! is no way to name another application from here.

use appdeck_core::{MemberLevel, Timestamp};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::cached_store::CachedStore;
use crate::error::{ApiError, ApiResult};
use crate::extractors::TenantContext;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct LatestVersionResponse {
    pub app_name: String,
    pub version: String,
    /// HTML-escaped changelog, safe to embed.
    pub changelog: String,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantLevelsResponse {
    pub app_name: String,
    pub member_levels: Vec<MemberLevel>,
}

/// GET /api/v1/external/version - Latest published version
pub async fn latest_version(
    State(cached): State<CachedStore>,
    TenantContext(scope): TenantContext,
) -> ApiResult<Json<LatestVersionResponse>> {
    let versions = cached.list_versions(scope.tenant_id).await?;
    let latest = versions
        .into_iter()
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .ok_or_else(|| ApiError::not_found("No version has been published"))?;

    Ok(Json(LatestVersionResponse {
        app_name: scope.tenant_name,
        version: latest.version,
        changelog: latest.changelog_html,
        updated_at: latest.created_at,
    }))
}

/// GET /api/v1/external/member-levels - Tiers of the caller's application
pub async fn member_levels(
    State(cached): State<CachedStore>,
    TenantContext(scope): TenantContext,
) -> ApiResult<Json<TenantLevelsResponse>> {
    let member_levels = cached.list_member_levels(Some(scope.tenant_id)).await?;
    Ok(Json(TenantLevelsResponse {
        app_name: scope.tenant_name,
        member_levels,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/version", get(latest_version))
        .route("/member-levels", get(member_levels))
}

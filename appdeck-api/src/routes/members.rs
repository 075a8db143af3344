//! Member Tier REST API Routes
//!
//! Tiers are read by any operator and replaced wholesale by admins.

use appdeck_core::{
    ApplicationId, AuditAction, EntityKind, MemberLevel, NewMemberLevel, PermissionSet,
};
use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::cached_store::CachedStore;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ClientIp, SessionIdentity};
use crate::middleware::{require_role, RoleGuard};
use crate::services::{AuditEntry, AuditRecorder};
use crate::state::AppState;

const LEVEL_NAME_MAX_CHARS: usize = 50;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLevelsQuery {
    pub app_id: Option<ApplicationId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelsResponse {
    pub levels: Vec<MemberLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberLevelInput {
    pub app_id: ApplicationId,
    #[serde(default)]
    pub name: String,
    pub level: u32,
    /// Parsed into a [`PermissionSet`] here and nowhere else.
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
}

impl MemberLevelInput {
    fn into_new(self) -> ApiResult<NewMemberLevel> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::missing_field("name"));
        }
        if name.chars().count() > LEVEL_NAME_MAX_CHARS {
            return Err(ApiError::invalid_range("name", 1, LEVEL_NAME_MAX_CHARS));
        }
        let permissions = match self.permissions {
            Some(value) => PermissionSet::from_value(value)?,
            None => PermissionSet::default(),
        };
        Ok(NewMemberLevel {
            app_id: self.app_id,
            name: name.to_string(),
            level: self.level,
            permissions,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceLevelsRequest {
    pub levels: Vec<MemberLevelInput>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/member/levels?app_id= - Ordered by level ascending
pub async fn list_levels(
    State(cached): State<CachedStore>,
    Query(query): Query<ListLevelsQuery>,
) -> ApiResult<Json<LevelsResponse>> {
    let levels = cached.list_member_levels(query.app_id).await?;
    Ok(Json(LevelsResponse { levels }))
}

/// PUT /api/v1/member/levels - Replace every tier (admin only)
pub async fn replace_levels(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
    Json(req): Json<ReplaceLevelsRequest>,
) -> ApiResult<Json<LevelsResponse>> {
    let levels = req
        .levels
        .into_iter()
        .map(MemberLevelInput::into_new)
        .collect::<ApiResult<Vec<_>>>()?;

    let stored = cached.replace_member_levels(levels).await?;

    audit
        .record(
            AuditEntry::by(&actor, AuditAction::Update, EntityKind::MemberLevel)
                .details(format!("replaced with {} level(s)", stored.len()))
                .ip_address(ip),
        )
        .await;

    Ok(Json(LevelsResponse { levels: stored }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/levels", get(list_levels)).route(
        "/levels",
        put(replace_levels).route_layer(from_fn_with_state(RoleGuard::admin_only(), require_role)),
    )
}

//! Application and Version REST API Routes
//!
//! Reads go through the cache-aside [`CachedStore`]; writes commit to the
//! primary store and invalidate before the response is sent.

use appdeck_core::{
    validate_app_name, validate_version_string, Application, ApplicationId, ApplicationPatch,
    AuditAction, EntityKind, NewApplication, NewVersion, ScopeStatus, Version,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::generate_api_key;
use crate::cached_store::CachedStore;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppId, ClientIp, SessionIdentity};
use crate::services::{AuditEntry, AuditRecorder};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateApplicationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ScopeStatus>,
}

impl UpdateApplicationRequest {
    fn into_patch(self) -> ApiResult<ApplicationPatch> {
        let name = match self.name {
            Some(name) => {
                validate_app_name(&name)?;
                Some(name.trim().to_string())
            }
            None => None,
        };
        let patch = ApplicationPatch {
            name,
            description: self.description,
            status: self.status,
        };
        if patch.is_empty() {
            return Err(ApiError::validation_failed(
                "At least one of name, description or status is required",
            ));
        }
        Ok(patch)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateVersionRequest {
    #[serde(default)]
    pub version: String,
    /// Markdown source.
    #[serde(default)]
    pub changelog: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteApplicationResponse {
    pub deleted_id: ApplicationId,
}

// ============================================================================
// APPLICATION HANDLERS
// ============================================================================

/// GET /api/v1/apps
pub async fn list_applications(
    State(cached): State<CachedStore>,
) -> ApiResult<Json<Vec<Application>>> {
    Ok(Json(cached.list_applications().await?))
}

/// POST /api/v1/apps - Create an application with a fresh API key
pub async fn create_application(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
    Json(req): Json<CreateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_app_name(&req.name)?;

    let app = cached
        .create_application(NewApplication {
            name: req.name.trim().to_string(),
            description: req.description.unwrap_or_default(),
            api_key: generate_api_key(),
        })
        .await?;

    tracing::info!(app_id = %app.id, name = %app.name, actor = %actor.subject_id, "Application created");
    audit
        .record(
            AuditEntry::by(&actor, AuditAction::Create, EntityKind::Application)
                .entity(app.id, &app.name)
                .ip_address(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(app)))
}

/// GET /api/v1/apps/:id - Application with its versions
pub async fn get_application(
    State(cached): State<CachedStore>,
    AppId(id): AppId,
) -> ApiResult<Json<Application>> {
    Ok(Json(cached.get_application(id).await?))
}

/// PUT /api/v1/apps/:id
pub async fn update_application(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
    AppId(id): AppId,
    Json(req): Json<UpdateApplicationRequest>,
) -> ApiResult<Json<Application>> {
    let patch = req.into_patch()?;
    let status_change = patch.status;
    let app = cached.update_application(id, patch).await?;

    let mut entry = AuditEntry::by(&actor, AuditAction::Update, EntityKind::Application)
        .entity(app.id, &app.name)
        .ip_address(ip);
    if let Some(status) = status_change {
        entry = entry.details(format!("status set to {:?}", status).to_lowercase());
    }
    audit.record(entry).await;

    Ok(Json(app))
}

/// DELETE /api/v1/apps/:id - Refused with 409 while versions exist
pub async fn delete_application(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
    AppId(id): AppId,
) -> ApiResult<Json<DeleteApplicationResponse>> {
    let app = cached.delete_application(id).await?;

    tracing::info!(app_id = %app.id, actor = %actor.subject_id, "Application deleted");
    audit
        .record(
            AuditEntry::by(&actor, AuditAction::Delete, EntityKind::Application)
                .entity(app.id, &app.name)
                .ip_address(ip),
        )
        .await;

    Ok(Json(DeleteApplicationResponse { deleted_id: app.id }))
}

// ============================================================================
// VERSION HANDLERS
// ============================================================================

/// GET /api/v1/apps/:id/versions - Newest first
pub async fn list_versions(
    State(cached): State<CachedStore>,
    AppId(id): AppId,
) -> ApiResult<Json<Vec<Version>>> {
    Ok(Json(cached.list_versions(id).await?))
}

/// POST /api/v1/apps/:id/versions - Publish a version and advance `latest_version`
pub async fn create_version(
    State(cached): State<CachedStore>,
    State(audit): State<AuditRecorder>,
    SessionIdentity(actor): SessionIdentity,
    ClientIp(ip): ClientIp,
    AppId(id): AppId,
    Json(req): Json<CreateVersionRequest>,
) -> ApiResult<impl IntoResponse> {
    let version_string = req.version.trim();
    if version_string.is_empty() {
        return Err(ApiError::missing_field("version"));
    }
    validate_version_string(version_string)?;

    let version = cached
        .create_version(NewVersion {
            app_id: id,
            version: version_string.to_string(),
            changelog_md: req.changelog,
        })
        .await?;

    audit
        .record(
            AuditEntry::by(&actor, AuditAction::Create, EntityKind::Version)
                .entity(version.id, &version.version)
                .details(format!("application {}", id))
                .ip_address(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(version)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route(
            "/:id",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/:id/versions", get(list_versions).post(create_version))
}

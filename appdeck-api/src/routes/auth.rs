//! Operator Authentication Routes
//!
//! `register` and `login` are public; `me` requires a session.

use appdeck_core::{AuditAction, EntityKind, User};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ClientIp, SessionIdentity};
use crate::services::{AccountService, AuditEntry, AuditRecorder, Registration};
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: appdeck_core::Timestamp,
    pub user: User,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/auth/register
pub async fn register(
    State(accounts): State<AccountService>,
    State(audit): State<AuditRecorder>,
    ClientIp(ip): ClientIp,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = accounts
        .register(Registration {
            username: req.username,
            password: req.password,
            email: req.email,
        })
        .await?;

    audit
        .record(
            AuditEntry::anonymous(&user.username, AuditAction::Register, EntityKind::User)
                .entity(user.id, &user.username)
                .ip_address(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(accounts): State<AccountService>,
    State(audit): State<AuditRecorder>,
    ClientIp(ip): ClientIp,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.username.trim().is_empty() {
        return Err(ApiError::missing_field("username"));
    }
    if req.password.is_empty() {
        return Err(ApiError::missing_field("password"));
    }

    match accounts.login(&req.username, &req.password).await {
        Ok(outcome) => {
            audit
                .record(
                    AuditEntry::anonymous(&outcome.user.username, AuditAction::Login, EntityKind::User)
                        .entity(outcome.user.id, &outcome.user.username)
                        .ip_address(ip),
                )
                .await;
            Ok(Json(LoginResponse {
                token: outcome.token.token,
                expires_at: outcome.token.expires_at,
                user: outcome.user,
            }))
        }
        Err(err) => {
            if matches!(err, AuthError::InvalidCredentials | AuthError::AccountDisabled) {
                audit
                    .record(
                        AuditEntry::anonymous(req.username.trim(), AuditAction::Login, EntityKind::User)
                            .details(err.reason_label())
                            .ip_address(ip)
                            .failed(),
                    )
                    .await;
            }
            Err(err.into())
        }
    }
}

/// GET /api/v1/auth/me
pub async fn me(
    State(accounts): State<AccountService>,
    SessionIdentity(identity): SessionIdentity,
) -> ApiResult<Json<User>> {
    let user = accounts.current_user(&identity).await?;
    Ok(Json(user))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

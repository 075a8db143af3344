//! Role allow-lists layered after the session guard.

use std::sync::Arc;

use appdeck_core::{Identity, Role};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::guard::GuardError;
use crate::auth::AuthError;
use crate::telemetry::METRICS;

/// Roles permitted through one route or router.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Arc<[Role]>,
}

impl RoleGuard {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    /// No identity means the session guard did not run: 401, not 403.
    pub fn check(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
        let identity = identity.ok_or(AuthError::MissingCredential)?;
        if identity.has_any_role(&self.allowed) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Axum middleware applying a [`RoleGuard`].
pub async fn require_role(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, GuardError> {
    if let Err(err) = guard.check(request.extensions().get::<Identity>()) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_auth_failure("role", err.reason_label());
        }
        if let Some(identity) = request.extensions().get::<Identity>() {
            tracing::warn!(
                target: "appdeck::audit",
                event = "role_denied",
                subject = %identity.subject_id,
                role = %identity.role,
                path = %request.uri().path(),
                "Role not permitted"
            );
        }
        return Err(err.into());
    }
    Ok(next.run(request).await)
}

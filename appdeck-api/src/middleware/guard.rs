//! Request guard: the single entry point for authentication.
//!
//! Every request is classified by path before anything else runs:
//! - `Public` passes through untouched
//! - `Session` requires `Authorization: Bearer <token>`
//! - `TenantKey` requires `X-API-Key`
//!
//! On success the resolved principal ([`Identity`] or [`TenantScope`]) is
//! attached to the request extensions. On failure the request is answered
//! here and never reaches a handler or the cache.

use std::sync::Arc;

use appdeck_core::{Identity, TenantScope};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthError, TenantKeyGate, TokenService, API_KEY_HEADER};
use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry::METRICS;

/// Prefixes served without credentials. Matched on whole path segments.
const PUBLIC_PREFIXES: &[&str] = &["/api/v1/health", "/api/v1/auth", "/metrics"];

/// Session routes nested under a public prefix.
const SESSION_EXCEPTIONS: &[&str] = &["/api/v1/auth/me"];

const TENANT_PREFIXES: &[&str] = &["/api/v1/external"];

/// Which credential a path requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Session,
    TenantKey,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Session => "session",
            RouteClass::TenantKey => "tenant",
        }
    }
}

fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Classify a request path. Anything not explicitly listed is `Session`.
pub fn classify(path: &str) -> RouteClass {
    // Dot segments never classify as anything weaker than a session.
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return RouteClass::Session;
    }
    if SESSION_EXCEPTIONS.iter().any(|p| under(path, p)) {
        return RouteClass::Session;
    }
    if PUBLIC_PREFIXES.iter().any(|p| under(path, p)) {
        return RouteClass::Public;
    }
    if TENANT_PREFIXES.iter().any(|p| under(path, p)) {
        return RouteClass::TenantKey;
    }
    RouteClass::Session
}

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Credential verifiers the guard delegates to.
#[derive(Debug, Clone)]
pub struct GuardState {
    pub tokens: Arc<TokenService>,
    pub tenant_gate: TenantKeyGate,
}

impl GuardState {
    pub fn new(tokens: Arc<TokenService>, tenant_gate: TenantKeyGate) -> Self {
        Self {
            tokens,
            tenant_gate,
        }
    }
}

impl From<&AppState> for GuardState {
    fn from(state: &AppState) -> Self {
        Self::new(state.tokens.clone(), state.tenant_gate.clone())
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Pull the token out of an `Authorization` header.
///
/// The scheme is matched case-insensitively; anything but a single
/// non-empty Bearer token is malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedAuthorization)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedAuthorization)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(AuthError::MalformedAuthorization);
    }
    Ok(token)
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

fn authenticate_session(state: &GuardState, headers: &HeaderMap) -> Result<Identity, AuthError> {
    let token = bearer_token(headers)?;
    state.tokens.validate(token)
}

async fn authenticate_tenant(state: &GuardState, headers: &HeaderMap) -> Result<TenantScope, AuthError> {
    state.tenant_gate.authorize(api_key(headers)).await
}

fn reject(class: RouteClass, path: &str, err: AuthError) -> GuardError {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_auth_failure(class.as_str(), err.reason_label());
    }
    if matches!(class, RouteClass::Session) {
        tracing::warn!(
            target: "appdeck::audit",
            event = "session_rejected",
            reason = err.reason_label(),
            path = %path,
            "Session credential rejected"
        );
    } else {
        tracing::debug!(reason = err.reason_label(), path = %path, "Tenant credential rejected");
    }
    GuardError(err.into())
}

/// Axum middleware enforcing the route classification.
///
/// # Example
///
/// ```ignore
/// let guard_state = GuardState::from(&state);
/// let app = Router::new()
///     .nest("/api/v1", api_routes)
///     .layer(middleware::from_fn_with_state(guard_state, request_guard));
/// ```
pub async fn request_guard(
    State(state): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GuardError> {
    let path = request.uri().path().to_owned();
    let class = classify(&path);

    match class {
        RouteClass::Public => {}
        RouteClass::Session => {
            let identity = authenticate_session(&state, request.headers())
                .map_err(|e| reject(class, &path, e))?;
            request.extensions_mut().insert(identity);
        }
        RouteClass::TenantKey => {
            let scope = authenticate_tenant(&state, request.headers())
                .await
                .map_err(|e| reject(class, &path, e))?;
            request.extensions_mut().insert(scope);
        }
    }

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for guard middleware that implements IntoResponse.
#[derive(Debug)]
pub struct GuardError(pub ApiError);

impl From<AuthError> for GuardError {
    fn from(err: AuthError) -> Self {
        GuardError(err.into())
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

//! Typed access to the principal attached by the request guard.
//!
//! Handlers get read-only clones; the guard is the only writer.

use appdeck_core::{Identity, TenantScope};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Operator behind a session-guarded request.
///
/// Only present on `Session` routes. Used elsewhere it rejects with 401,
/// never with a default identity.
#[derive(Debug, Clone)]
pub struct SessionIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(SessionIdentity)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl std::ops::Deref for SessionIdentity {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Application an external caller's API key resolved to.
#[derive(Debug, Clone)]
pub struct TenantContext(pub TenantScope);

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantScope>()
            .cloned()
            .map(TenantContext)
            .ok_or_else(|| ApiError::unauthorized("API key required"))
    }
}

impl std::ops::Deref for TenantContext {
    type Target = TenantScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Best-effort client address for audit entries, from `X-Forwarded-For`
/// (first hop) or `X-Real-IP`. Never rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let forwarded = header("x-forwarded-for").and_then(|v| {
            v.split(',')
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        });
        Ok(ClientIp(forwarded.or_else(|| header("x-real-ip"))))
    }
}

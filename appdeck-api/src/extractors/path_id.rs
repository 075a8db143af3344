//! Typed application ID from the `:id` path parameter.

use appdeck_core::ApplicationId;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::error::ApiError;

/// Extractor for `/apps/:id` style routes.
///
/// Rejects anything that is not a decimal `u64` with `400 INVALID_FORMAT`
/// instead of axum's plain-text path rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppId(pub ApplicationId);

#[async_trait]
impl<S> FromRequestParts<S> for AppId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::invalid_format("id", "a positive integer"))?;
        parse_app_id(&raw).map(AppId)
    }
}

fn parse_app_id(raw: &str) -> Result<ApplicationId, ApiError> {
    raw.parse::<ApplicationId>()
        .map_err(|_| ApiError::invalid_format("id", "a positive integer"))
}

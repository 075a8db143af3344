//! Request guard and role guard behaviour over the full router.
//!
//! Every protected route must answer 401 before any handler runs when the
//! credential is missing or bad, and 403 when the role is insufficient.

use std::sync::Arc;

use appdeck_api::{ApiError, AuthConfig, ErrorCode, FixedClock, JwtSecret, TokenService};
use appdeck_test_utils::fixtures::{
    admin_identity, user_identity, ACTIVE_APP_KEY, INACTIVE_APP_KEY,
};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

#[path = "support/app.rs"]
mod app_support;
use app_support::{spawn_app, TestResult, SECRET};

fn error_code(body: &Value) -> TestResult<ErrorCode> {
    let err: ApiError = serde_json::from_value(body.clone())?;
    Ok(err.code)
}

// ============================================================================
// PUBLIC ROUTES
// ============================================================================

#[tokio::test]
async fn test_public_routes_need_no_credentials() -> TestResult {
    let app = spawn_app().await?;

    let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.call(Method::GET, "/api/v1/health/ready", None, None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/metrics", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_login_is_reachable_without_a_token() -> TestResult {
    let app = spawn_app().await?;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "wrong-password" })),
        )
        .await?;
    // Rejected by the handler, not the guard.
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password");
    Ok(())
}

// ============================================================================
// SESSION ROUTES
// ============================================================================

#[tokio::test]
async fn test_session_route_without_token_is_unauthorized() -> TestResult {
    let app = spawn_app().await?;
    for uri in ["/api/v1/apps", "/api/v1/auth/me", "/api/v1/member/levels"] {
        let (status, body) = app.call(Method::GET, uri, None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(error_code(&body)?, ErrorCode::Unauthorized);
    }
    Ok(())
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() -> TestResult {
    let app = spawn_app().await?;
    let (status, body) = app
        .call(Method::GET, "/api/v1/apps", Some("Basic YWRtaW46YWRtaW4="), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body)?, ErrorCode::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_tampered_token_is_rejected() -> TestResult {
    let app = spawn_app().await?;
    let bearer = app.bearer_for(&admin_identity())?;
    let mut tampered = bearer.clone();
    tampered.pop();
    tampered.push(if bearer.ends_with('A') { 'B' } else { 'A' });

    let (status, body) = app.call(Method::GET, "/api/v1/apps", Some(&tampered), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body)?, ErrorCode::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() -> TestResult {
    let app = spawn_app().await?;
    let foreign = TokenService::new(AuthConfig::new(JwtSecret::new(
        "a-completely-different-signing-secret",
    )?));
    let token = foreign.issue(&admin_identity())?.token;

    let (status, body) = app
        .call(Method::GET, "/api/v1/apps", Some(&format!("Bearer {}", token)), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body)?, ErrorCode::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_rejected() -> TestResult {
    let app = spawn_app().await?;
    // Issued in 2020 with a one hour lifetime.
    let stale = TokenService::new(
        AuthConfig::new(JwtSecret::new(SECRET)?)
            .with_clock(Arc::new(FixedClock(1577836800)))
            .with_token_ttl_secs(3600),
    );
    let token = stale.issue(&admin_identity())?.token;

    let (status, body) = app
        .call(Method::GET, "/api/v1/apps", Some(&format!("Bearer {}", token)), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body)?, ErrorCode::TokenExpired);
    Ok(())
}

#[tokio::test]
async fn test_valid_token_reaches_handler() -> TestResult {
    let app = spawn_app().await?;
    let bearer = app.bearer_for(&user_identity())?;

    let (status, body) = app.call(Method::GET, "/api/v1/apps", Some(&bearer), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_api_key_does_not_open_session_routes() -> TestResult {
    let app = spawn_app().await?;
    let (status, _) = app.call_external("/api/v1/apps", Some(ACTIVE_APP_KEY)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

// ============================================================================
// ROLE CHECKS
// ============================================================================

#[tokio::test]
async fn test_system_routes_are_admin_only() -> TestResult {
    let app = spawn_app().await?;
    let user = app.bearer_for(&user_identity())?;
    let admin = app.bearer_for(&admin_identity())?;

    for (method, uri) in [
        (Method::GET, "/api/v1/system/audit-logs"),
        (Method::GET, "/api/v1/system/cache/stats"),
        (Method::DELETE, "/api/v1/system/cache/clear"),
        (Method::GET, "/api/v1/system/performance/stats"),
        (Method::POST, "/api/v1/system/performance/reset"),
    ] {
        let (status, body) = app.call(method.clone(), uri, Some(&user), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(error_code(&body)?, ErrorCode::Forbidden);

        let (status, _) = app.call(method.clone(), uri, Some(&admin), None).await?;
        assert_eq!(status, StatusCode::OK, "{} {}", method, uri);
    }
    Ok(())
}

#[tokio::test]
async fn test_member_level_replace_is_admin_only() -> TestResult {
    let app = spawn_app().await?;
    let user = app.bearer_for(&user_identity())?;
    let levels = json!({
        "levels": [{ "app_id": app.active_app.id, "name": "Free", "level": 0 }]
    });

    let (status, _) = app
        .call(Method::GET, "/api/v1/member/levels", Some(&user), None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::PUT, "/api/v1/member/levels", Some(&user), Some(levels.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.bearer_for(&admin_identity())?;
    let (status, body) = app
        .call(Method::PUT, "/api/v1/member/levels", Some(&admin), Some(levels))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["levels"][0]["name"], "Free");
    Ok(())
}

// ============================================================================
// TENANT KEY ROUTES
// ============================================================================

#[tokio::test]
async fn test_external_route_requires_key() -> TestResult {
    let app = spawn_app().await?;
    let (status, body) = app.call_external("/api/v1/external/member-levels", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "API key required");
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_inactive_keys_look_identical() -> TestResult {
    let app = spawn_app().await?;
    let unknown = app
        .call_external("/api/v1/external/member-levels", Some("not-a-real-key"))
        .await?;
    let inactive = app
        .call_external("/api/v1/external/member-levels", Some(INACTIVE_APP_KEY))
        .await?;

    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, inactive);
    Ok(())
}

#[tokio::test]
async fn test_session_token_does_not_open_external_routes() -> TestResult {
    let app = spawn_app().await?;
    let bearer = app.bearer_for(&admin_identity())?;
    let (status, _) = app
        .call(Method::GET, "/api/v1/external/member-levels", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_active_key_is_scoped_to_its_application() -> TestResult {
    let app = spawn_app().await?;
    let (status, body) = app
        .call_external("/api/v1/external/member-levels", Some(ACTIVE_APP_KEY))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_name"], app.active_app.name);
    assert_eq!(body["member_levels"], json!([]));

    let (status, body) = app
        .call_external("/api/v1/external/version", Some(ACTIVE_APP_KEY))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body)?, ErrorCode::EntityNotFound);
    Ok(())
}

//! Property-Based Tests for Session Tokens and Route Classification
//!
//! - Any active identity survives issue then validate unchanged.
//! - A token is accepted exactly while `nbf <= now < exp`.
//! - No path containing dot segments classifies weaker than a session.
//! - No garbage `Authorization` value gets past the guard.

use std::sync::Arc;

use appdeck_api::{classify, AuthConfig, AuthError, FixedClock, JwtSecret, RouteClass, TokenService};
use appdeck_test_utils::generators::arb_identity;
use axum::http::{Method, StatusCode};
use proptest::prelude::*;
use tokio::runtime::Runtime;

#[path = "support/app.rs"]
mod app_support;
use app_support::{spawn_app, SECRET};

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

/// 2024-01-01 00:00:00 UTC
const ISSUED_AT: i64 = 1704067200;

fn service_at(now: i64, ttl_secs: i64) -> Result<TokenService, TestCaseError> {
    let secret = JwtSecret::new(SECRET).map_err(|e| TestCaseError::fail(e.to_string()))?;
    Ok(TokenService::new(
        AuthConfig::new(secret)
            .with_clock(Arc::new(FixedClock(now)))
            .with_token_ttl_secs(ttl_secs),
    ))
}

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

fn path_segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("api".to_string()),
        Just("v1".to_string()),
        Just("health".to_string()),
        Just("auth".to_string()),
        Just("external".to_string()),
        Just("metrics".to_string()),
        "[a-z0-9_-]{1,12}",
    ]
}

/// Header values that are not a currently valid session token.
fn bad_authorization_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9_-]{10,60}".prop_map(|s| format!("Bearer {}", s)),
        "[A-Za-z0-9_-]{10,40}\\.[A-Za-z0-9_-]{10,40}\\.[A-Za-z0-9_-]{10,40}"
            .prop_map(|s| format!("Bearer {}", s)),
        "[A-Za-z]{3,10} [A-Za-z0-9_-]{10,40}",
        Just("Bearer".to_string()),
        Just("Bearer ".to_string()),
    ]
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_issue_then_validate_preserves_identity(identity in arb_identity()) {
        let tokens = service_at(ISSUED_AT, 3600)?;
        let issued = tokens.issue(&identity).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded = tokens.validate(&issued.token).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, identity);
    }

    #[test]
    fn prop_token_valid_only_inside_its_window(
        identity in arb_identity(),
        ttl in 1i64..86_400,
        offset in -1_000i64..200_000,
    ) {
        let issuer = service_at(ISSUED_AT, ttl)?;
        let token = issuer.issue(&identity).map_err(|e| TestCaseError::fail(e.to_string()))?.token;

        let verifier = service_at(ISSUED_AT + offset, ttl)?;
        let result = verifier.validate(&token);

        if offset < 0 {
            prop_assert!(
                matches!(result, Err(AuthError::InvalidToken { .. })),
                "not-yet-valid token accepted"
            );
        } else if offset < ttl {
            prop_assert!(result.is_ok(), "token rejected inside its window");
        } else {
            prop_assert_eq!(result, Err(AuthError::TokenExpired));
        }
    }

    #[test]
    fn prop_dot_segments_never_public(
        before in prop::collection::vec(path_segment_strategy(), 0..4),
        dots in prop_oneof![Just("."), Just("..")],
        after in prop::collection::vec(path_segment_strategy(), 0..4),
    ) {
        let mut segments = before;
        segments.push(dots.to_string());
        segments.extend(after);
        let path = format!("/{}", segments.join("/"));
        prop_assert_eq!(classify(&path), RouteClass::Session);
    }

    #[test]
    fn prop_garbage_authorization_never_passes(value in bad_authorization_strategy()) {
        let rt = test_runtime()?;
        let status = rt.block_on(async {
            let app = spawn_app().await.map_err(|e| TestCaseError::fail(e.to_string()))?;
            let (status, _) = app
                .call(Method::GET, "/api/v1/apps", Some(&value), None)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            Ok::<_, TestCaseError>(status)
        })?;
        prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

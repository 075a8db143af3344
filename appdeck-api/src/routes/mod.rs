//! REST API Route Modules
//!
//! Each module exposes `create_router() -> Router<AppState>`; this module
//! nests them under `/api/v1` and applies the security layers.

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::middleware::{request_guard, require_role, GuardState, RoleGuard};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub mod apps;
pub mod auth;
pub mod external;
pub mod health;
pub mod members;
pub mod system;

/// Requests served concurrently before new ones queue.
const MAX_IN_FLIGHT_REQUESTS: usize = 1024;

/// Build the complete router with authentication, observability and CORS.
///
/// Layer order (outermost first): CORS, concurrency limit, observability,
/// request guard, then per-router role checks.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let guard_state = GuardState::from(&state);

    let api_routes = Router::new()
        .nest("/health", health::create_router())
        .nest("/auth", auth::create_router())
        .nest("/apps", apps::create_router())
        .nest("/member", members::create_router())
        .nest(
            "/system",
            system::create_router()
                .route_layer(from_fn_with_state(RoleGuard::admin_only(), require_role)),
        )
        .nest("/external", external::create_router());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(metrics_handler))
        .layer(from_fn_with_state(guard_state, request_guard))
        .layer(from_fn_with_state(
            state.performance.clone(),
            observability_middleware,
        ))
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT_REQUESTS))
        .layer(build_cors_layer(api_config))
}

// ============================================================================
// CORS LAYER
// ============================================================================

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        let cors = cors.allow_origin(origins).allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(crate::auth::API_KEY_HEADER),
        ]);
        if config.cors_allow_credentials {
            cors.allow_credentials(true)
        } else {
            cors
        }
    }
}

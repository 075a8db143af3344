//! AppDeck API Server Entry Point
//!
//! Loads configuration, connects the cache, seeds the first operator and
//! starts the Axum HTTP server.

use std::sync::Arc;

use appdeck_api::telemetry::{init_tracer, TelemetryConfig};
use appdeck_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, CacheSettings,
    SeedOperator, TokenService,
};
use appdeck_storage::InMemoryStore;
use axum::Router;

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenvy::dotenv().ok();

    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    // No fallback secret: refuse to start without one.
    let auth_config = AuthConfig::from_env()?;
    auth_config.validate_for_production()?;

    let api_config = ApiConfig::from_env()?;
    let cache_settings = CacheSettings::from_env()?;

    let store = Arc::new(InMemoryStore::new());
    let cache = cache_settings.connect().await;

    let state = AppState::new(
        store.clone(),
        store,
        cache,
        TokenService::new(auth_config),
    );

    if let Some(seed) = SeedOperator::from_env() {
        if let Some(user) = state.accounts.seed_operator(&seed).await? {
            tracing::info!(user_id = %user.id, username = %user.username, "Seeded operator account");
        }
    }

    let app: Router = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting AppDeck API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

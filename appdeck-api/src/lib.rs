//! AppDeck API - REST Management Backend
//!
//! Operator-facing REST endpoints for applications, versions and member
//! tiers, plus a key-authenticated external API for client applications.
//! Reads are served cache-aside through [`CachedStore`]; every write
//! invalidates the keys it can make stale before the response is sent.

#[macro_use]
mod macros;

pub mod auth;
pub mod cached_store;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{
    generate_api_key, AuthConfig, AuthError, Claims, FixedClock, IssuedToken, JwtClock, JwtSecret,
    SystemClock, TenantKeyGate, TokenService, API_KEY_HEADER,
};
pub use cached_store::CachedStore;
pub use config::{ApiConfig, CacheBackendKind, CacheSettings, SeedOperator};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{classify, request_guard, require_role, GuardState, RoleGuard, RouteClass};
pub use routes::create_api_router;
pub use services::{AccountService, AuditRecorder};
pub use state::AppState;

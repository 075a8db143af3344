//! Middleware modules for the AppDeck API
//!
//! - `guard`: route classification and credential checks
//! - `role`: role allow-lists for admin-only routes
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .nest("/api/v1/system", system_routes.route_layer(from_fn_with_state(RoleGuard::admin_only(), require_role)))
//!     // Guard must run before any role check (provides the identity)
//!     .layer(from_fn_with_state(guard_state, request_guard))
//!     .layer(from_fn_with_state(performance, observability_middleware))
//!     .layer(cors)
//! ```

mod guard;
mod role;

pub use guard::{bearer_token, classify, request_guard, GuardError, GuardState, RouteClass};
pub use role::{require_role, RoleGuard};

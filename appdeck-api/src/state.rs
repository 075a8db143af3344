//! Shared application state for Axum routers.
//!
//! Everything a handler touches is constructed once in `main` and injected
//! here; there are no process-wide singletons besides the metrics registry.

use std::sync::Arc;
use std::time::Instant;

use appdeck_storage::{CacheCoordinator, CredentialStore, PrimaryStore};

use crate::auth::{TenantKeyGate, TokenService};
use crate::cached_store::CachedStore;
use crate::services::{AccountService, AuditRecorder};
use crate::telemetry::PerformanceStats;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Raw primary store, for records without a cached projection.
    pub store: Arc<dyn PrimaryStore>,
    /// Cache-aside view of the primary store. Routes should prefer it for
    /// applications, versions and member levels.
    pub cached_store: CachedStore,
    pub accounts: AccountService,
    pub tokens: Arc<TokenService>,
    pub tenant_gate: TenantKeyGate,
    pub audit: AuditRecorder,
    pub performance: Arc<PerformanceStats>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PrimaryStore>,
        credentials: Arc<dyn CredentialStore>,
        cache: CacheCoordinator,
        tokens: TokenService,
    ) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            cached_store: CachedStore::new(store.clone(), cache),
            accounts: AccountService::new(store.clone(), credentials.clone(), tokens.clone()),
            tenant_gate: TenantKeyGate::new(credentials),
            audit: AuditRecorder::new(store.clone()),
            performance: Arc::new(PerformanceStats::new()),
            start_time: Instant::now(),
            tokens,
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cached_store", &self.cached_store)
            .field("uptime_secs", &self.start_time.elapsed().as_secs())
            .finish_non_exhaustive()
    }
}

crate::impl_from_ref!(Arc<dyn PrimaryStore>, store);
crate::impl_from_ref!(CachedStore, cached_store);
crate::impl_from_ref!(AccountService, accounts);
crate::impl_from_ref!(Arc<TokenService>, tokens);
crate::impl_from_ref!(TenantKeyGate, tenant_gate);
crate::impl_from_ref!(AuditRecorder, audit);
crate::impl_from_ref!(Arc<PerformanceStats>, performance);
crate::impl_from_ref!(Instant, start_time);

//! Cache-aside coordinator.
//!
//! The coordinator is the only component that talks to a cache backend. It
//! renders keys, applies TTL policy, bounds every backend call with a
//! timeout and degrades to "always miss" when the backend misbehaves. No
//! cache failure is ever returned to a caller.
//!
//! # Invalidation epoch
//!
//! `read_through` snapshots a process-local epoch before fetching from the
//! primary store. Every invalidation bumps the epoch before it deletes, so a
//! fetch that overlapped an invalidation is returned to its caller but not
//! written back. The epoch is re-checked after the write; if an invalidation
//! slipped in between, the freshly written key is removed again.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appdeck_core::AppdeckResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;

use super::backend::CacheBackend;
use super::key::{CacheKey, KeyPattern, DEFAULT_KEY_PREFIX};
use super::policy::{Mutation, TtlPolicy};

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Prefix for every physical key.
    pub prefix: String,
    /// TTL per namespace class.
    pub ttl: TtlPolicy,
    /// Bound on get, set and single-key delete.
    pub op_timeout: Duration,
    /// Bound on pattern deletes.
    pub clear_timeout: Duration,
    /// Bound on the startup ping.
    pub connect_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: TtlPolicy::default(),
            op_timeout: Duration::from_secs(2),
            clear_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_op_timeout(mut self, duration: Duration) -> Self {
        self.op_timeout = duration;
        self
    }

    pub fn with_clear_timeout(mut self, duration: Duration) -> Self {
        self.clear_timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }
}

/// Whether the coordinator is talking to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Enabled,
    Disabled,
}

/// Point-in-time counters for observability.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CacheStatistics {
    pub mode: CacheMode,
    pub backend: Option<&'static str>,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// `None` when the backend could not report a size.
    pub approx_size: Option<u64>,
}

impl CacheStatistics {
    fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

struct Inner {
    backend: Option<Arc<dyn CacheBackend>>,
    config: CoordinatorConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    epoch: AtomicU64,
}

/// Cheap-to-clone handle shared by every request.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("backend", &self.inner.backend.as_ref().map(|b| b.name()))
            .field("config", &self.inner.config)
            .finish()
    }
}

impl CacheCoordinator {
    /// Coordinator over a backend assumed reachable.
    pub fn new(backend: Arc<dyn CacheBackend>, config: CoordinatorConfig) -> Self {
        Self::build(Some(backend), config)
    }

    /// Coordinator that misses on every read and ignores every write.
    pub fn disabled(config: CoordinatorConfig) -> Self {
        Self::build(None, config)
    }

    fn build(backend: Option<Arc<dyn CacheBackend>>, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Ping the backend within the connect timeout. An unreachable backend
    /// yields a disabled coordinator; the process keeps running.
    pub async fn connect(backend: Arc<dyn CacheBackend>, config: CoordinatorConfig) -> Self {
        let name = backend.name();
        match timeout(config.connect_timeout, backend.ping()).await {
            Ok(Ok(())) => {
                tracing::info!(backend = name, prefix = %config.prefix, "Cache backend connected");
                Self::new(backend, config)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    backend = name,
                    error = %e,
                    "Cache backend unreachable, running with caching disabled"
                );
                Self::disabled(config)
            }
            Err(_) => {
                tracing::warn!(
                    backend = name,
                    timeout_ms = config.connect_timeout.as_millis() as u64,
                    "Cache backend ping timed out, running with caching disabled"
                );
                Self::disabled(config)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.backend.is_some()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.inner.config.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.inner.config.prefix
    }

    fn backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.inner.backend.as_ref()
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn record_hit(&self) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Raw lookup without touching hit/miss counters.
    async fn lookup(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let backend = self.backend()?;
        let rendered = key.render(self.prefix());
        match timeout(self.inner.config.op_timeout, backend.get(&rendered)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!(key = %rendered, error = %e, "Cache read failed");
                None
            }
            Err(_) => {
                tracing::warn!(key = %rendered, "Cache read timed out");
                None
            }
        }
    }

    /// Fetch a payload. Disabled, failing, slow, absent and expired all
    /// read as a miss.
    pub async fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let value = self.lookup(key).await;
        if value.is_some() {
            self.record_hit();
        } else {
            self.record_miss();
        }
        value
    }

    /// Store a payload; failures are logged and dropped.
    pub async fn write(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) {
        let Some(backend) = self.backend() else {
            return;
        };
        let rendered = key.render(self.prefix());
        match timeout(self.inner.config.op_timeout, backend.set(&rendered, value, ttl)).await {
            Ok(Ok(())) => {
                tracing::debug!(key = %rendered, ttl_secs = ttl.as_secs(), "Cache write");
            }
            Ok(Err(e)) => {
                tracing::warn!(key = %rendered, error = %e, "Cache write failed");
            }
            Err(_) => {
                tracing::warn!(key = %rendered, "Cache write timed out");
            }
        }
    }

    async fn delete_key(&self, rendered: &str) {
        let Some(backend) = self.backend() else {
            return;
        };
        match timeout(self.inner.config.op_timeout, backend.delete(rendered)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(key = %rendered, error = %e, "Cache delete failed");
            }
            Err(_) => {
                tracing::warn!(key = %rendered, "Cache delete timed out");
            }
        }
    }

    /// Remove everything matching `pattern`. Never fails.
    pub async fn invalidate(&self, pattern: &KeyPattern) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let Some(backend) = self.backend() else {
            return;
        };
        let rendered = pattern.render(self.prefix());
        if pattern.is_exact() {
            self.delete_key(&rendered).await;
            return;
        }

        match timeout(
            self.inner.config.clear_timeout,
            backend.delete_pattern(&rendered),
        )
        .await
        {
            Ok(Ok(removed)) => {
                tracing::debug!(pattern = %rendered, removed, "Cache pattern invalidated");
            }
            Ok(Err(e)) => {
                tracing::warn!(pattern = %rendered, error = %e, "Cache pattern invalidation failed");
            }
            Err(_) => {
                tracing::warn!(pattern = %rendered, "Cache pattern invalidation timed out");
            }
        }
    }

    /// Invalidate every pattern a mutation stales, in order.
    pub async fn apply(&self, mutation: &Mutation) {
        for pattern in mutation.invalidation_set() {
            self.invalidate(&pattern).await;
        }
        tracing::debug!(mutation = mutation.as_str(), "Cache invalidation applied");
    }

    pub async fn statistics(&self) -> CacheStatistics {
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);

        let approx_size = match self.backend() {
            Some(backend) => {
                let pattern = KeyPattern::All.render(self.prefix());
                match timeout(self.inner.config.op_timeout, backend.approx_size(&pattern)).await {
                    Ok(Ok(size)) => Some(size),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Cache size query failed");
                        None
                    }
                    Err(_) => None,
                }
            }
            None => None,
        };

        CacheStatistics {
            mode: if self.is_enabled() {
                CacheMode::Enabled
            } else {
                CacheMode::Disabled
            },
            backend: self.backend().map(|b| b.name()),
            hits,
            misses,
            hit_rate: CacheStatistics::compute_hit_rate(hits, misses),
            approx_size,
        }
    }

    /// Typed read. An undecodable payload counts as a miss and is removed.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let Some(bytes) = self.lookup(key).await else {
            self.record_miss();
            return None;
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                self.record_hit();
                Some(value)
            }
            Err(e) => {
                let rendered = key.render(self.prefix());
                tracing::warn!(key = %rendered, error = %e, "Discarding undecodable cache entry");
                self.record_miss();
                self.delete_key(&rendered).await;
                None
            }
        }
    }

    /// Typed write with an explicit TTL.
    pub async fn put_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.is_enabled() {
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => self.write(key, bytes, ttl).await,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache payload serialization failed");
            }
        }
    }

    /// Cache-aside read: serve from cache, else fetch from primary storage
    /// and populate with the namespace's TTL.
    ///
    /// Fetch errors propagate; cache errors never do.
    pub async fn read_through<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> AppdeckResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppdeckResult<T>>,
    {
        if let Some(value) = self.get_json(key).await {
            return Ok(value);
        }

        let epoch = self.current_epoch();
        let value = fetch().await?;

        if !self.is_enabled() {
            return Ok(value);
        }
        if self.current_epoch() != epoch {
            tracing::debug!(key = %key, "Invalidation raced fetch, skipping cache fill");
            return Ok(value);
        }

        let ttl = self.ttl_policy().ttl_for(key.namespace());
        self.put_json(key, &value, ttl).await;

        if self.current_epoch() != epoch {
            self.delete_key(&key.render(self.prefix())).await;
        }
        Ok(value)
    }
}

//! Cache backend trait.
//!
//! Backends store opaque byte payloads under rendered string keys. They know
//! nothing about namespaces, TTL policy or degradation; the coordinator owns
//! all of that. Implementations must be safe to share across tasks.

use std::time::Duration;

use async_trait::async_trait;
use appdeck_core::CacheError;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for statistics and logs.
    fn name(&self) -> &'static str;

    /// Fetch a payload. Expired entries are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a payload that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove one key. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key matching a glob whose only wildcard is a trailing `*`.
    ///
    /// Returns the number of keys removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Approximate number of live entries matching a glob, with the same
    /// syntax as [`CacheBackend::delete_pattern`].
    async fn approx_size(&self, pattern: &str) -> Result<u64, CacheError>;
}

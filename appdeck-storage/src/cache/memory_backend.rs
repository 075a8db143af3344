//! Single-process cache backend on a concurrent map.
//!
//! Expiry is measured with tokio's clock, so tests running with paused time
//! can advance past a TTL deterministically.

use std::time::Duration;

use async_trait::async_trait;
use appdeck_core::CacheError;
use dashmap::DashMap;
use tokio::time::Instant;

use super::backend::CacheBackend;

#[derive(Debug, Clone)]
struct CachedEntry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, CachedEntry>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

fn glob_prefix(pattern: &str) -> Option<&str> {
    pattern.strip_suffix('*')
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.payload.clone()));
            }
        } else {
            return Ok(None);
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                payload: value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let Some(prefix) = glob_prefix(pattern) else {
            return Ok(self.entries.remove(pattern).map_or(0, |_| 1));
        };
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn approx_size(&self, pattern: &str) -> Result<u64, CacheError> {
        self.purge_expired();
        let Some(prefix) = glob_prefix(pattern) else {
            return Ok(u64::from(self.entries.contains_key(pattern)));
        };
        let count = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() -> Result<(), CacheError> {
        let backend = InMemoryCacheBackend::new();
        backend.set("k", b"v".to_vec(), Duration::from_secs(60)).await?;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(backend.get("k").await?, Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(backend.get("k").await?, None);
        assert_eq!(backend.approx_size("*").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pattern_prefix() -> Result<(), CacheError> {
        let backend = InMemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set("appdeck:versions:1", vec![1], ttl).await?;
        backend.set("appdeck:versions:2", vec![2], ttl).await?;
        backend.set("appdeck:app-list:list", vec![3], ttl).await?;
        backend.set("other:versions:1", vec![4], ttl).await?;

        assert_eq!(backend.delete_pattern("appdeck:versions:*").await?, 2);
        assert_eq!(backend.get("appdeck:app-list:list").await?, Some(vec![3]));

        assert_eq!(backend.delete_pattern("appdeck:*").await?, 1);
        assert_eq!(backend.get("other:versions:1").await?, Some(vec![4]));
        Ok(())
    }

    #[tokio::test]
    async fn test_approx_size_counts_only_matching_keys() -> Result<(), CacheError> {
        let backend = InMemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set("appdeck:versions:1", vec![1], ttl).await?;
        backend.set("appdeck:app-list:list", vec![2], ttl).await?;
        backend.set("other:versions:1", vec![3], ttl).await?;

        assert_eq!(backend.approx_size("appdeck:*").await?, 2);
        assert_eq!(backend.approx_size("appdeck:versions:*").await?, 1);
        assert_eq!(backend.approx_size("other:versions:1").await?, 1);
        assert_eq!(backend.approx_size("other:versions:2").await?, 0);
        assert_eq!(backend.approx_size("*").await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pattern_without_wildcard_is_exact() -> Result<(), CacheError> {
        let backend = InMemoryCacheBackend::new();
        let ttl = Duration::from_secs(60);
        backend.set("appdeck:versions:1", vec![1], ttl).await?;
        backend.set("appdeck:versions:10", vec![2], ttl).await?;

        assert_eq!(backend.delete_pattern("appdeck:versions:1").await?, 1);
        assert_eq!(backend.get("appdeck:versions:10").await?, Some(vec![2]));
        Ok(())
    }
}

//! Shared cache backend on Redis through a deadpool connection pool.

use std::time::Duration;

use async_trait::async_trait;
use appdeck_core::CacheError;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use super::backend::CacheBackend;

/// Keys fetched per SCAN round while clearing or counting by pattern.
const SCAN_BATCH: usize = 200;

pub struct RedisCacheBackend {
    pool: Pool,
}

impl RedisCacheBackend {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `url`. Reachability is checked by the coordinator's
    /// startup ping, not here.
    pub fn connect(url: &str, pool_size: usize, timeout: Duration) -> Result<Self, CacheError> {
        let mut config = Config::from_url(url);
        if let Some(ref mut pool_config) = config.pool {
            pool_config.max_size = pool_size;
            pool_config.timeouts.wait = Some(timeout);
            pool_config.timeouts.create = Some(timeout);
            pool_config.timeouts.recycle = Some(timeout);
        }
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable {
                reason: format!("failed to create redis pool: {}", e),
            })?;
        Ok(Self::new(pool))
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(|e| CacheError::Unavailable {
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("pool_status", &self.pool.status())
            .finish()
    }
}

fn backend_error(e: redis::RedisError) -> CacheError {
    CacheError::Backend {
        reason: e.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(backend_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(backend_error)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(backend_error)?;

            if !keys.is_empty() {
                let count: u64 = conn.del(&keys).await.map_err(backend_error)?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }
        tracing::debug!(pattern = %pattern, removed, "Redis pattern delete");
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn approx_size(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut size: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(backend_error)?;
            size += keys.len() as u64;

            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(size)
    }
}

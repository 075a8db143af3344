//! API Configuration Module
//!
//! Listener, CORS, cache backend and seed-operator settings. Everything is
//! loaded from environment variables with development defaults; the token
//! secret lives in [`crate::auth::AuthConfig`] because it has no default.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use appdeck_core::ConfigError;
use appdeck_storage::{
    CacheCoordinator, CoordinatorConfig, InMemoryCacheBackend, RedisCacheBackend, TtlPolicy,
    DEFAULT_KEY_PREFIX,
};
use secrecy::SecretString;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Listener and CORS configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `APPDECK_API_BIND`: listen host (default: 0.0.0.0)
    /// - `APPDECK_API_PORT` or `PORT`: listen port (default: 8080)
    /// - `APPDECK_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `APPDECK_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `APPDECK_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_host = std::env::var("APPDECK_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("APPDECK_API_PORT").or_else(|_| std::env::var("PORT")) {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "APPDECK_API_PORT".to_string(),
                value: raw.clone(),
                reason: "expected a port number".to_string(),
            })?,
            Err(_) => defaults.port,
        };

        let cors_origins = std::env::var("APPDECK_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("APPDECK_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("APPDECK_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        Ok(Self {
            bind_host,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind_host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: "APPDECK_API_BIND".to_string(),
            value: raw,
            reason: "expected an IP address".to_string(),
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Which cache backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
    /// Caching off; every read goes to the primary store.
    None,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" => Ok(CacheBackendKind::Memory),
            "none" | "off" | "disabled" => Ok(CacheBackendKind::None),
            other => Err(ConfigError::InvalidValue {
                field: "APPDECK_CACHE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected redis, memory or none".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    pub redis_pool_size: usize,
    pub prefix: String,
    pub op_timeout: Duration,
    pub clear_timeout: Duration,
    pub ttl: TtlPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let coordinator = CoordinatorConfig::default();
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_pool_size: 16,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            op_timeout: coordinator.op_timeout,
            clear_timeout: coordinator.clear_timeout,
            ttl: TtlPolicy::default(),
        }
    }
}

impl CacheSettings {
    /// Environment variables:
    /// - `APPDECK_CACHE_BACKEND`: redis | memory | none (default: memory)
    /// - `APPDECK_REDIS_URL`, `APPDECK_REDIS_POOL_SIZE`
    /// - `APPDECK_CACHE_PREFIX` (default: `appdeck:`)
    /// - `APPDECK_CACHE_OP_TIMEOUT_MS` (2000), `APPDECK_CACHE_CLEAR_TIMEOUT_MS` (5000)
    /// - `APPDECK_CACHE_TTL_LIST_SECS`, `APPDECK_CACHE_TTL_DETAIL_SECS`,
    ///   `APPDECK_CACHE_TTL_CONFIG_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match std::env::var("APPDECK_CACHE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.backend,
        };

        let prefix = std::env::var("APPDECK_CACHE_PREFIX").unwrap_or(defaults.prefix);
        if prefix.is_empty() || prefix.contains('*') {
            return Err(ConfigError::InvalidValue {
                field: "APPDECK_CACHE_PREFIX".to_string(),
                value: prefix,
                reason: "must be non-empty and contain no wildcard".to_string(),
            });
        }

        Ok(Self {
            backend,
            redis_url: std::env::var("APPDECK_REDIS_URL").unwrap_or(defaults.redis_url),
            redis_pool_size: env_number("APPDECK_REDIS_POOL_SIZE", defaults.redis_pool_size as u64)?
                as usize,
            prefix,
            op_timeout: Duration::from_millis(env_number(
                "APPDECK_CACHE_OP_TIMEOUT_MS",
                defaults.op_timeout.as_millis() as u64,
            )?),
            clear_timeout: Duration::from_millis(env_number(
                "APPDECK_CACHE_CLEAR_TIMEOUT_MS",
                defaults.clear_timeout.as_millis() as u64,
            )?),
            ttl: TtlPolicy {
                list: Duration::from_secs(env_number(
                    "APPDECK_CACHE_TTL_LIST_SECS",
                    defaults.ttl.list.as_secs(),
                )?),
                detail: Duration::from_secs(env_number(
                    "APPDECK_CACHE_TTL_DETAIL_SECS",
                    defaults.ttl.detail.as_secs(),
                )?),
                config: Duration::from_secs(env_number(
                    "APPDECK_CACHE_TTL_CONFIG_SECS",
                    defaults.ttl.config.as_secs(),
                )?),
            },
        })
    }

    pub fn to_coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_prefix(self.prefix.clone())
            .with_ttl_policy(self.ttl)
            .with_op_timeout(self.op_timeout)
            .with_clear_timeout(self.clear_timeout)
    }

    /// Build the coordinator for the configured backend.
    ///
    /// An unreachable or misconfigured Redis degrades to a disabled cache;
    /// startup never fails because of the cache.
    pub async fn connect(&self) -> CacheCoordinator {
        let config = self.to_coordinator_config();
        match self.backend {
            CacheBackendKind::None => {
                tracing::info!("Caching disabled by configuration");
                CacheCoordinator::disabled(config)
            }
            CacheBackendKind::Memory => {
                let backend = Arc::new(InMemoryCacheBackend::new());
                spawn_memory_purge(backend.clone(), self.ttl.list);
                CacheCoordinator::connect(backend, config).await
            }
            CacheBackendKind::Redis => {
                match RedisCacheBackend::connect(&self.redis_url, self.redis_pool_size, self.op_timeout) {
                    Ok(backend) => CacheCoordinator::connect(Arc::new(backend), config).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis pool setup failed, running with caching disabled");
                        CacheCoordinator::disabled(config)
                    }
                }
            }
        }
    }
}

/// Drop expired entries from the in-process backend periodically.
fn spawn_memory_purge(backend: Arc<InMemoryCacheBackend>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            backend.purge_expired();
        }
    });
}

fn env_number(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: "expected a positive integer".to_string(),
            }),
            Ok(value) => Ok(value),
        },
        Err(_) => Ok(default),
    }
}

// ============================================================================
// SEED OPERATOR
// ============================================================================

/// Operator account created at startup when none exists.
///
/// There is no default password: without `APPDECK_ADMIN_PASSWORD` nothing
/// is seeded.
#[derive(Debug, Clone)]
pub struct SeedOperator {
    pub username: String,
    pub password: SecretString,
    pub email: String,
}

impl SeedOperator {
    pub fn from_env() -> Option<Self> {
        let password = std::env::var("APPDECK_ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty())?;
        let username =
            std::env::var("APPDECK_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let email = std::env::var("APPDECK_ADMIN_EMAIL")
            .unwrap_or_else(|_| format!("{}@localhost", username));
        Some(Self {
            username,
            password: SecretString::new(password.into()),
            email,
        })
    }
}

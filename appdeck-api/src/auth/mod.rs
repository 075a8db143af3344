//! Authentication Module
//!
//! Two independent trust boundaries:
//! 1. Operator sessions, via signed tokens in `Authorization: Bearer`
//!    ([`TokenService`])
//! 2. External machine callers, via per-application keys in `X-API-Key`
//!    ([`TenantKeyGate`])
//!
//! Password hashing for operator login lives in [`password`].

mod error;
pub mod password;
mod tenant_gate;
mod token;

pub use error::{AuthError, KeyRejection};
pub use tenant_gate::{generate_api_key, TenantKeyGate, API_KEY_HEADER};
pub use token::{Claims, IssuedToken, TokenService};

use appdeck_core::ConfigError;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Environment variable holding the token signing secret.
pub const JWT_SECRET_ENV: &str = "APPDECK_JWT_SECRET";

/// Minimum secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for token time checks.
///
/// Time validation is done here rather than inside `jsonwebtoken`, so tests
/// can inject a fixed instant and a broken host clock surfaces as an error
/// instead of a panic.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. Negative before 1970.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2020-01-01 00:00:00 UTC
    pub fn expired() -> FixedClock {
        FixedClock(1577836800)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// Token signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Wrap a secret. Blank secrets are rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: JWT_SECRET_ENV.to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for signing and verification).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Session token configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,

    /// Token lifetime in seconds (default: 24 hours)
    pub token_ttl_secs: i64,

    /// Tolerance applied to `exp` and `nbf` checks (default: 0)
    pub clock_skew_secs: i64,

    /// Deployment environment name, lowercased
    pub environment: String,

    /// Clock for token time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("environment", &self.environment)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl AuthConfig {
    /// Configuration with default lifetimes around an explicit secret.
    pub fn new(jwt_secret: JwtSecret) -> Self {
        Self {
            jwt_secret,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            clock_skew_secs: 0,
            environment: "development".to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Load from environment variables.
    ///
    /// # Environment Variables
    /// - `APPDECK_JWT_SECRET`: signing secret (required, no fallback)
    /// - `APPDECK_TOKEN_TTL_SECS`: token lifetime (default: 86400)
    /// - `APPDECK_TOKEN_CLOCK_SKEW_SECS`: skew tolerance (default: 0)
    /// - `APPDECK_ENVIRONMENT`: `production`/`prod` enables strict checks
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var(JWT_SECRET_ENV).map_err(|_| ConfigError::MissingRequired {
            field: JWT_SECRET_ENV.to_string(),
        })?;

        let token_ttl_secs = parse_env_i64("APPDECK_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "APPDECK_TOKEN_TTL_SECS".to_string(),
                value: token_ttl_secs.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let clock_skew_secs = parse_env_i64("APPDECK_TOKEN_CLOCK_SKEW_SECS", 0)?;
        if clock_skew_secs < 0 {
            return Err(ConfigError::InvalidValue {
                field: "APPDECK_TOKEN_CLOCK_SKEW_SECS".to_string(),
                value: clock_skew_secs.to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        Ok(Self {
            jwt_secret: JwtSecret::new(secret)?,
            token_ttl_secs,
            clock_skew_secs,
            environment: std::env::var("APPDECK_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .to_lowercase(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn JwtClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_token_ttl_secs(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn with_clock_skew_secs(mut self, secs: i64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into().to_lowercase();
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    /// Reject weak secrets in production; warn about them elsewhere.
    ///
    /// Called once at startup.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            if self.is_production() {
                return Err(ConfigError::InvalidValue {
                    field: JWT_SECRET_ENV.to_string(),
                    value: format!("[{} chars]", self.jwt_secret.len()),
                    reason: format!(
                        "must be at least {} characters in production",
                        MIN_PRODUCTION_SECRET_LEN
                    ),
                });
            }
            tracing::warn!(
                secret_len = self.jwt_secret.len(),
                environment = %self.environment,
                "JWT secret is short. For production, use at least {} characters.",
                MIN_PRODUCTION_SECRET_LEN
            );
        }
        Ok(())
    }
}

fn parse_env_i64(key: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw,
            reason: "expected an integer".to_string(),
        }),
        Err(_) => Ok(default),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _secret = EnvVarGuard::set(JWT_SECRET_ENV, None);

        let err = AuthConfig::from_env().err();
        assert_eq!(
            err,
            Some(ConfigError::MissingRequired {
                field: JWT_SECRET_ENV.to_string()
            })
        );
    }

    #[test]
    fn test_blank_secret_fails_fast() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _secret = EnvVarGuard::set(JWT_SECRET_ENV, Some("   "));

        assert!(matches!(
            AuthConfig::from_env(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_from_env_reads_lifetimes() -> Result<(), ConfigError> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _secret = EnvVarGuard::set(JWT_SECRET_ENV, Some("an-adequately-long-signing-secret!"));
        let _ttl = EnvVarGuard::set("APPDECK_TOKEN_TTL_SECS", Some("900"));
        let _skew = EnvVarGuard::set("APPDECK_TOKEN_CLOCK_SKEW_SECS", None);
        let _env = EnvVarGuard::set("APPDECK_ENVIRONMENT", Some("Production"));

        let config = AuthConfig::from_env()?;
        assert_eq!(config.token_ttl_secs, 900);
        assert_eq!(config.clock_skew_secs, 0);
        assert!(config.is_production());
        config.validate_for_production()
    }

    #[test]
    fn test_unparseable_ttl_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _secret = EnvVarGuard::set(JWT_SECRET_ENV, Some("secret"));
        let _ttl = EnvVarGuard::set("APPDECK_TOKEN_TTL_SECS", Some("a day"));

        assert!(matches!(
            AuthConfig::from_env(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_short_secret_rejected_in_production() -> Result<(), ConfigError> {
        let config = AuthConfig::new(JwtSecret::new("short")?).with_environment("prod");
        assert!(config.validate_for_production().is_err());
        Ok(())
    }

    #[test]
    fn test_short_secret_allowed_in_development() -> Result<(), ConfigError> {
        let config = AuthConfig::new(JwtSecret::new("short")?);
        assert!(config.validate_for_production().is_ok());
        Ok(())
    }

    #[test]
    fn test_secret_debug_is_redacted() -> Result<(), ConfigError> {
        let secret = JwtSecret::new("super-secret-value")?;
        let debug = format!("{:?}", AuthConfig::new(secret));
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("REDACTED"));
        Ok(())
    }
}

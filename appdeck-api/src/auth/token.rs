//! Session tokens for operators.

use appdeck_core::{AccountStatus, Identity, Role, Timestamp, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{AuthConfig, AuthError};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (decimal user id)
    pub sub: String,

    /// Display name at issue time
    pub name: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    fn for_identity(identity: &Identity, now: i64, ttl_secs: i64) -> Self {
        Self {
            sub: identity.subject_id.to_string(),
            name: identity.display_name.clone(),
            role: identity.role,
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl_secs),
        }
    }

    fn into_identity(self) -> Result<Identity, AuthError> {
        let subject_id: UserId = self.sub.parse().map_err(|_| AuthError::InvalidToken {
            reason: "subject is not a user id".to_string(),
        })?;
        Ok(Identity {
            subject_id,
            display_name: self.name,
            role: self.role,
            // Only active accounts are ever issued tokens.
            account_status: AccountStatus::Active,
        })
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Issues and validates HS256 session tokens.
///
/// Validation is stateless: it never consults the credential store, so a
/// disabled account's outstanding tokens stay valid until they expire.
#[derive(Clone)]
pub struct TokenService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .field("algorithm", &ALGORITHM)
            .finish()
    }
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        let secret = config.jwt_secret.expose().as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        // Signature and algorithm only; time checks use the injected clock.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "nbf".to_string()]);

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn now(&self) -> Result<i64, AuthError> {
        let now = self.config.clock.now_epoch_secs();
        if now < 0 {
            tracing::error!(
                timestamp = now,
                "System clock returned pre-epoch time - server time is broken"
            );
            return Err(AuthError::ClockUnavailable);
        }
        Ok(now)
    }

    /// Sign a token for `identity`, valid from now for the configured lifetime.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        if !identity.account_status.is_active() {
            return Err(AuthError::AccountDisabled);
        }

        let now = self.now()?;
        let claims = Claims::for_identity(identity, now, self.config.token_ttl_secs);
        let expires_at =
            chrono::DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
                AuthError::Configuration {
                    reason: format!("token expiry {} is out of range", claims.exp),
                }
            })?;

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            AuthError::Configuration {
                reason: format!("failed to sign token: {}", e),
            }
        })?;

        tracing::debug!(subject = %identity.subject_id, exp = claims.exp, "Session token issued");
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and algorithm, then the token's time window.
    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode_claims(token)?;
        let now = self.now()?;
        validate_claim_times(now, claims.exp, claims.nbf, self.config.clock_skew_secs)?;
        claims.into_identity()
    }

    /// Decode and verify the signature without checking times.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        use jsonwebtoken::errors::ErrorKind;

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "signature mismatch",
                    ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                        "unsupported algorithm"
                    }
                    ErrorKind::MissingRequiredClaim(_) => "missing required claim",
                    ErrorKind::Json(_) => "malformed claims",
                    _ => "malformed token",
                };
                AuthError::InvalidToken {
                    reason: reason.to_string(),
                }
            })
    }
}

/// A token is valid while `nbf <= now < exp`, widened by `leeway_secs`.
fn validate_claim_times(now: i64, exp: i64, nbf: i64, leeway_secs: i64) -> Result<(), AuthError> {
    if now.saturating_add(leeway_secs) < nbf {
        return Err(AuthError::InvalidToken {
            reason: "not yet valid".to_string(),
        });
    }
    if now.saturating_sub(leeway_secs) >= exp {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{test_clocks, FixedClock, JwtSecret};
    use appdeck_core::ConfigError;
    use std::sync::Arc;

    const SECRET: &str = "test-signing-secret-of-reasonable-length";

    fn service_at(clock: FixedClock) -> Result<TokenService, ConfigError> {
        let config = AuthConfig::new(JwtSecret::new(SECRET)?).with_clock(Arc::new(clock));
        Ok(TokenService::new(config))
    }

    fn operator() -> Identity {
        Identity {
            subject_id: UserId::new(42),
            display_name: "ops".to_string(),
            role: Role::Admin,
            account_status: AccountStatus::Active,
        }
    }

    #[test]
    fn test_issue_and_validate_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let service = service_at(test_clocks::valid())?;
        let issued = service.issue(&operator())?;

        assert_eq!(service.validate(&issued.token)?, operator());
        assert_eq!(
            issued.expires_at.timestamp(),
            test_clocks::valid().0 + 24 * 60 * 60
        );
        Ok(())
    }

    #[test]
    fn test_claims_carry_window() -> Result<(), Box<dyn std::error::Error>> {
        let service = service_at(test_clocks::valid())?;
        let issued = service.issue(&operator())?;
        let claims = service.decode_claims(&issued.token)?;

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 86_400);
        Ok(())
    }

    #[test]
    fn test_expired_token_is_distinct_from_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let issued = service_at(test_clocks::expired())?.issue(&operator())?;
        let result = service_at(test_clocks::valid())?.validate(&issued.token);
        assert_eq!(result, Err(AuthError::TokenExpired));
        Ok(())
    }

    #[test]
    fn test_token_expires_exactly_at_exp() -> Result<(), Box<dyn std::error::Error>> {
        let start = test_clocks::valid().0;
        let config = AuthConfig::new(JwtSecret::new(SECRET)?).with_token_ttl_secs(60);
        let issued = TokenService::new(config.clone().with_clock(Arc::new(FixedClock(start))))
            .issue(&operator())?;

        let just_before = TokenService::new(config.clone().with_clock(Arc::new(FixedClock(start + 59))));
        assert!(just_before.validate(&issued.token).is_ok());

        let at_exp = TokenService::new(config.with_clock(Arc::new(FixedClock(start + 60))));
        assert_eq!(at_exp.validate(&issued.token), Err(AuthError::TokenExpired));
        Ok(())
    }

    #[test]
    fn test_clock_skew_extends_window() -> Result<(), Box<dyn std::error::Error>> {
        let start = test_clocks::valid().0;
        let config = AuthConfig::new(JwtSecret::new(SECRET)?)
            .with_token_ttl_secs(60)
            .with_clock_skew_secs(30);
        let issued = TokenService::new(config.clone().with_clock(Arc::new(FixedClock(start))))
            .issue(&operator())?;

        let late = TokenService::new(config.with_clock(Arc::new(FixedClock(start + 80))));
        assert!(late.validate(&issued.token).is_ok());
        Ok(())
    }

    #[test]
    fn test_not_yet_valid_token_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let issued = service_at(test_clocks::future())?.issue(&operator())?;
        let result = service_at(test_clocks::valid())?.validate(&issued.token);
        assert_eq!(
            result,
            Err(AuthError::InvalidToken {
                reason: "not yet valid".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn test_tampered_signature_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let service = service_at(test_clocks::valid())?;
        let issued = service.issue(&operator())?;

        let (body, signature) = issued
            .token
            .rsplit_once('.')
            .ok_or("token has no signature segment")?;
        let mid = signature.len() / 2;
        let flipped = if &signature[mid..mid + 1] == "A" { "B" } else { "A" };
        let tampered = format!("{}.{}{}{}", body, &signature[..mid], flipped, &signature[mid + 1..]);

        assert!(matches!(
            service.validate(&tampered),
            Err(AuthError::InvalidToken { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let other = TokenService::new(
            AuthConfig::new(JwtSecret::new("a-completely-different-secret")?)
                .with_clock(Arc::new(test_clocks::valid())),
        );
        let issued = other.issue(&operator())?;

        let result = service_at(test_clocks::valid())?.validate(&issued.token);
        assert_eq!(
            result,
            Err(AuthError::InvalidToken {
                reason: "signature mismatch".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn test_other_algorithm_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let service = service_at(test_clocks::valid())?;
        let claims = Claims::for_identity(&operator(), test_clocks::valid().0, 3600);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )?;

        assert!(matches!(
            service.validate(&token),
            Err(AuthError::InvalidToken { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_garbage_is_invalid() -> Result<(), ConfigError> {
        let service = service_at(test_clocks::valid())?;
        for token in ["", "not-a-token", "a.b.c", "Bearer x"] {
            assert!(
                matches!(service.validate(token), Err(AuthError::InvalidToken { .. })),
                "{:?} should be invalid",
                token
            );
        }
        Ok(())
    }

    #[test]
    fn test_disabled_identity_is_not_issued() -> Result<(), ConfigError> {
        let service = service_at(test_clocks::valid())?;
        let disabled = Identity {
            account_status: AccountStatus::Disabled,
            ..operator()
        };
        assert_eq!(service.issue(&disabled), Err(AuthError::AccountDisabled));
        Ok(())
    }

    #[test]
    fn test_pre_epoch_clock_errors_instead_of_panicking() -> Result<(), ConfigError> {
        let service = service_at(FixedClock(-1))?;
        assert_eq!(service.issue(&operator()), Err(AuthError::ClockUnavailable));
        Ok(())
    }
}

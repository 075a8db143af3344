//! Argon2id password hashing for operator accounts.
//!
//! Hashing is CPU-bound, so both operations run on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;

/// Well-formed hash with the default Argon2 parameters that no password
/// produces. Verified against when a login names an unknown user, so that
/// path costs the same as a wrong password.
pub const DECOY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$YXBwZGVjay1kdW1teS1zYQ$bm8tc3VjaC1hY2NvdW50LXBhc3N3b3JkLWRpZ2VzdCE";

/// Hash a password into a PHC string.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AuthError::Configuration {
            reason: format!("password hashing task failed: {}", e),
        })?
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash is a mismatch, not an error, so login cannot
/// tell the two apart.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash))
        .await
        .map_err(|e| AuthError::Configuration {
            reason: format!("password verification task failed: {}", e),
        })
}

fn hash_password_blocking(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Configuration {
            reason: format!("password hashing failed: {}", e),
        })?;
    Ok(hash.to_string())
}

fn verify_password_blocking(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

//! Operator accounts: registration, login and the startup seed.

use std::sync::Arc;

use appdeck_core::{AccountStatus, Identity, NewUser, Role, User, ValidationError};
use appdeck_storage::{CredentialStore, PrimaryStore};
use secrecy::ExposeSecret;

use crate::auth::password::{hash_password, verify_password, DECOY_PASSWORD_HASH};
use crate::auth::{AuthError, IssuedToken, TokenService};
use crate::config::SeedOperator;
use crate::error::{ApiError, ApiResult};

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 20;
const PASSWORD_MIN_CHARS: usize = 6;

/// Self-service registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "username".to_string(),
            });
        }
        let len = username.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
            return Err(ValidationError::LengthOutOfRange {
                field: "username".to_string(),
                min: USERNAME_MIN_CHARS,
                max: USERNAME_MAX_CHARS,
            });
        }

        if self.password.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "password".to_string(),
            });
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(ValidationError::InvalidValue {
                field: "password".to_string(),
                reason: format!("must be at least {} characters", PASSWORD_MIN_CHARS),
            });
        }

        validate_email(self.email.trim())
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "email".to_string(),
        });
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "email".to_string(),
            reason: "not a valid email address".to_string(),
        });
    }
    Ok(())
}

/// Successful login: the signed session and the account it belongs to.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: User,
}

/// The session principal for a stored account.
pub fn identity_for(user: &User) -> Identity {
    Identity {
        subject_id: user.id,
        display_name: user.username.clone(),
        role: user.role,
        account_status: user.status,
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn PrimaryStore>,
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(
        store: Arc<dyn PrimaryStore>,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<User>, AuthError> {
        self.credentials
            .find_user_by_username(username)
            .await
            .map_err(|e| AuthError::CredentialStoreUnavailable {
                reason: e.to_string(),
            })
    }

    /// Check a username and password and issue a session token.
    ///
    /// Unknown usernames and wrong passwords fail identically, both in the
    /// error and in the Argon2 work done. The disabled check runs only after
    /// the password matched.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.lookup(username.trim()).await? else {
            // Pay the hash cost anyway; the result is always a mismatch.
            verify_password(password, DECOY_PASSWORD_HASH).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.status.is_active() {
            return Err(AuthError::AccountDisabled);
        }

        let token = self.tokens.issue(&identity_for(&user))?;
        Ok(LoginOutcome { token, user })
    }

    /// Create a self-registered account. The role is always `user`.
    pub async fn register(&self, registration: Registration) -> ApiResult<User> {
        registration.validate()?;
        let password_hash = hash_password(&registration.password).await?;

        let user = self
            .store
            .insert_user(NewUser {
                username: registration.username.trim().to_string(),
                password_hash,
                email: registration.email.trim().to_string(),
                role: Role::User,
                status: AccountStatus::Active,
            })
            .await?;
        Ok(user)
    }

    /// Account behind a session. A token whose account has since been
    /// deleted or renamed no longer resolves.
    pub async fn current_user(&self, identity: &Identity) -> ApiResult<User> {
        match self.lookup(&identity.display_name).await? {
            Some(user) if user.id == identity.subject_id => Ok(user),
            _ => Err(ApiError::entity_not_found("user", identity.subject_id)),
        }
    }

    /// Create the configured admin operator unless the username is taken.
    pub async fn seed_operator(&self, seed: &SeedOperator) -> ApiResult<Option<User>> {
        if self.lookup(&seed.username).await?.is_some() {
            tracing::debug!(username = %seed.username, "Seed operator already present");
            return Ok(None);
        }

        let password_hash = hash_password(seed.password.expose_secret()).await?;
        let user = self
            .store
            .insert_user(NewUser {
                username: seed.username.clone(),
                password_hash,
                email: seed.email.clone(),
                role: Role::Admin,
                status: AccountStatus::Active,
            })
            .await?;
        tracing::info!(username = %user.username, user_id = %user.id, "Seeded admin operator");
        Ok(Some(user))
    }
}

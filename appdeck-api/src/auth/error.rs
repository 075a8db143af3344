//! Authentication failures and their caller-visible mapping.

use thiserror::Error;

use crate::error::{ApiError, ErrorCode};

/// Why a tenant API key was refused.
///
/// Both variants look the same to the caller; the distinction is kept for
/// audit events only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRejection {
    /// No application owns the key.
    UnknownKey,
    /// The owning application exists but is not active.
    InactiveTenant,
}

impl KeyRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRejection::UnknownKey => "unknown_key",
            KeyRejection::InactiveTenant => "inactive_tenant",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication credential")]
    MissingCredential,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedAuthorization,

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing API key")]
    MissingKey,

    #[error("Invalid API key ({})", .0.as_str())]
    InvalidKey(KeyRejection),

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Role not permitted")]
    Forbidden,

    #[error("Authentication misconfigured: {reason}")]
    Configuration { reason: String },

    #[error("Server clock returned a pre-epoch time")]
    ClockUnavailable,

    #[error("Credential store unavailable: {reason}")]
    CredentialStoreUnavailable { reason: String },
}

impl AuthError {
    /// Short label used for metrics and audit events.
    pub fn reason_label(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedAuthorization => "malformed_authorization",
            AuthError::InvalidToken { .. } => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::MissingKey => "missing_key",
            AuthError::InvalidKey(rejection) => rejection.as_str(),
            AuthError::AccountDisabled => "account_disabled",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Forbidden => "forbidden",
            AuthError::Configuration { .. } => "configuration",
            AuthError::ClockUnavailable => "clock_unavailable",
            AuthError::CredentialStoreUnavailable { .. } => "credential_store_unavailable",
        }
    }
}

/// Caller-visible form. Signature details, key material and store internals
/// stay in the logs.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ApiError::unauthorized("Authentication required"),
            AuthError::MalformedAuthorization => {
                ApiError::invalid_token("Authorization header must use Bearer scheme")
            }
            AuthError::InvalidToken { .. } => ApiError::from_code(ErrorCode::InvalidToken),
            AuthError::TokenExpired => ApiError::token_expired(),
            AuthError::MissingKey => ApiError::unauthorized("API key required"),
            AuthError::InvalidKey(_) => ApiError::unauthorized("Invalid API key"),
            AuthError::AccountDisabled => ApiError::forbidden("Account is disabled"),
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid username or password"),
            AuthError::Forbidden => ApiError::forbidden("Insufficient role for this resource"),
            AuthError::Configuration { reason } => {
                tracing::error!(reason = %reason, "Authentication misconfigured");
                ApiError::internal_error("Server misconfigured")
            }
            AuthError::ClockUnavailable => {
                ApiError::internal_error("Server time configuration error")
            }
            AuthError::CredentialStoreUnavailable { reason } => {
                tracing::error!(reason = %reason, "Credential store unavailable");
                ApiError::service_unavailable("Authentication temporarily unavailable")
            }
        }
    }
}

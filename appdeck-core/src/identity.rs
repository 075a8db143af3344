//! Identity types for AppDeck principals and records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Defines a numeric record identifier.
///
/// Identifiers serialize as bare integers and always display as decimal, so
/// anything that formats them (cache keys, audit entries, URLs) agrees on one
/// textual form.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

define_id!(
    /// Operator account identifier.
    UserId
);
define_id!(
    /// Application (tenant) identifier.
    ApplicationId
);
define_id!(VersionId);
define_id!(MemberLevelId);
define_id!(AuditLogId);

// ============================================================================
// ROLES AND STATUSES
// ============================================================================

/// Operator role, parsed once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ValidationError::InvalidValue {
                field: "role".to_string(),
                reason: format!("unknown role '{}'", other),
            }),
        }
    }
}

/// Operator account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// Application status, which is also the status of its API-key scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeStatus {
    #[default]
    Active,
    Inactive,
}

impl ScopeStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ScopeStatus::Active)
    }
}

// ============================================================================
// PRINCIPALS
// ============================================================================

/// An authenticated operator, carried in a session token.
///
/// Immutable for the lifetime of a request and never persisted by the
/// authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub account_status: AccountStatus,
}

impl Identity {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// The application an external caller is bound to by its API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantScope {
    pub tenant_id: ApplicationId,
    pub tenant_name: String,
    pub scope_status: ScopeStatus,
}

/// Short, non-reversible fingerprint of a secret for log correlation.
///
/// Returns the first 12 hex characters of the SHA-256 digest.
pub fn secret_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(12);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_decimal() {
        assert_eq!(ApplicationId::new(7).to_string(), "7");
        assert_eq!(UserId::new(1234).to_string(), "1234");
    }

    #[test]
    fn test_id_serializes_as_integer() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&VersionId::new(99))?;
        assert_eq!(json, "99");
        let back: VersionId = serde_json::from_str("99")?;
        assert_eq!(back, VersionId::new(99));
        Ok(())
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Role::Admin)?, "\"admin\"");
        Ok(())
    }

    #[test]
    fn test_identity_role_checks() {
        let identity = Identity {
            subject_id: UserId::new(1),
            display_name: "ops".to_string(),
            role: Role::User,
            account_status: AccountStatus::Active,
        };
        assert!(identity.has_role(Role::User));
        assert!(!identity.has_role(Role::Admin));
        assert!(identity.has_any_role(&[Role::Admin, Role::User]));
        assert!(!identity.has_any_role(&[Role::Admin]));
    }

    #[test]
    fn test_secret_fingerprint_is_stable_and_short() {
        let a = secret_fingerprint("abc");
        assert_eq!(a.len(), 12);
        assert_eq!(a, secret_fingerprint("abc"));
        assert_ne!(a, secret_fingerprint("abd"));
        assert!(!a.contains("abc"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_id_display_parses_back(raw in any::<u64>()) {
                let id = ApplicationId::new(raw);
                let rendered = id.to_string();
                prop_assert!(rendered.bytes().all(|b| b.is_ascii_digit()));
                prop_assert_eq!(rendered.parse::<ApplicationId>(), Ok(id));
            }

            #[test]
            fn prop_distinct_ids_display_distinctly(a in any::<u64>(), b in any::<u64>()) {
                prop_assume!(a != b);
                prop_assert_ne!(UserId::new(a).to_string(), UserId::new(b).to_string());
            }

            #[test]
            fn prop_fingerprint_never_echoes_secret(secret in "[a-f0-9]{16,64}") {
                let fingerprint = secret_fingerprint(&secret);
                prop_assert!(!fingerprint.contains(secret.as_str()));
                prop_assert_eq!(fingerprint, secret_fingerprint(&secret));
            }
        }
    }
}

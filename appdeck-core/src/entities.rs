//! Persisted records and their creation inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    AccountStatus, ApplicationId, AuditLogId, MemberLevelId, PermissionSet, Role, ScopeStatus,
    Timestamp, UserId, ValidationError, VersionId,
};

/// Minimum application name length, in characters.
pub const APP_NAME_MIN_CHARS: usize = 2;
/// Maximum application name length, in characters.
pub const APP_NAME_MAX_CHARS: usize = 20;

/// Record kind discriminator used in errors and audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Application,
    Version,
    MemberLevel,
    AuditLog,
    System,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Application => "application",
            EntityKind::Version => "version",
            EntityKind::MemberLevel => "member_level",
            EntityKind::AuditLog => "audit_log",
            EntityKind::System => "system",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// USERS
// ============================================================================

/// Operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-formatted password hash. Never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
}

// ============================================================================
// APPLICATIONS
// ============================================================================

/// A managed application. Its API key binds external callers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub description: String,
    pub latest_version: Option<String>,
    pub status: ScopeStatus,
    pub api_key: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Populated on detail reads only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub description: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ScopeStatus>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

// ============================================================================
// VERSIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub app_id: ApplicationId,
    pub version: String,
    pub changelog_md: String,
    pub changelog_html: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewVersion {
    pub app_id: ApplicationId,
    pub version: String,
    pub changelog_md: String,
}

// ============================================================================
// MEMBER LEVELS
// ============================================================================

/// A membership tier for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLevel {
    pub id: MemberLevelId,
    pub app_id: ApplicationId,
    pub name: String,
    pub level: u32,
    pub permissions: PermissionSet,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemberLevel {
    pub app_id: ApplicationId,
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub permissions: PermissionSet,
}

// ============================================================================
// AUDIT LOGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Register,
    ClearCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub action: AuditAction,
    pub entity_type: EntityKind,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: Timestamp,
    pub status: AuditStatus,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub action: AuditAction,
    pub entity_type: EntityKind,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub status: AuditStatus,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate an application name: 2 to 20 characters after trimming.
pub fn validate_app_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    let len = trimmed.chars().count();
    if !(APP_NAME_MIN_CHARS..=APP_NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::LengthOutOfRange {
            field: "name".to_string(),
            min: APP_NAME_MIN_CHARS,
            max: APP_NAME_MAX_CHARS,
        });
    }
    Ok(())
}

/// Validate a version string of the form `MAJOR.MINOR.PATCH`, ASCII digits only.
pub fn validate_version_string(version: &str) -> Result<(), ValidationError> {
    let mut parts = 0;
    for part in version.split('.') {
        parts += 1;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_version());
        }
    }
    if parts != 3 {
        return Err(invalid_version());
    }
    Ok(())
}

fn invalid_version() -> ValidationError {
    ValidationError::InvalidValue {
        field: "version".to_string(),
        reason: "expected MAJOR.MINOR.PATCH, e.g. 1.0.0".to_string(),
    }
}

/// Produce the HTML form of a changelog.
///
/// The markdown source is stored verbatim; the HTML form is the same text
/// with markup characters escaped so it can be embedded directly.
pub fn render_changelog_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    for c in markdown.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_app_name_bounds() {
        assert!(validate_app_name("ab").is_ok());
        assert!(validate_app_name(&"x".repeat(20)).is_ok());
        assert!(validate_app_name("a").is_err());
        assert!(validate_app_name(&"x".repeat(21)).is_err());
        assert!(matches!(
            validate_app_name("   "),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn test_validate_app_name_counts_characters() {
        // 10 multi-byte characters, 30 bytes
        assert!(validate_app_name(&"日".repeat(10)).is_ok());
    }

    #[test]
    fn test_validate_version_string() {
        assert!(validate_version_string("1.0.0").is_ok());
        assert!(validate_version_string("10.20.300").is_ok());
        assert!(validate_version_string("1.0").is_err());
        assert!(validate_version_string("1.0.0.0").is_err());
        assert!(validate_version_string("v1.0.0").is_err());
        assert!(validate_version_string("1..0").is_err());
        assert!(validate_version_string("1.0.0-beta").is_err());
        assert!(validate_version_string("").is_err());
        assert!(validate_version_string("１.0.0").is_err());
    }

    #[test]
    fn test_render_changelog_html_escapes() {
        assert_eq!(
            render_changelog_html("- fix <script> & \"quotes\""),
            "- fix &lt;script&gt; &amp; &quot;quotes&quot;"
        );
        assert_eq!(render_changelog_html("plain"), "plain");
    }

    #[test]
    fn test_user_password_hash_not_serialized() -> Result<(), serde_json::Error> {
        let now = chrono::Utc::now();
        let user = User {
            id: UserId::new(1),
            username: "admin".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user)?;
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password_hash"));
        Ok(())
    }

    #[test]
    fn test_application_patch_is_empty() {
        assert!(ApplicationPatch::default().is_empty());
        let patch = ApplicationPatch {
            status: Some(ScopeStatus::Inactive),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_three_numeric_parts_are_valid(
                major in 0u32..1000,
                minor in 0u32..1000,
                patch in 0u32..100_000,
            ) {
                let version = format!("{}.{}.{}", major, minor, patch);
                prop_assert!(validate_version_string(&version).is_ok());
            }

            #[test]
            fn prop_other_part_counts_are_invalid(
                parts in prop::collection::vec(0u32..100, 1..6),
            ) {
                prop_assume!(parts.len() != 3);
                let version = parts
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                prop_assert!(validate_version_string(&version).is_err());
            }

            #[test]
            fn prop_changelog_html_has_no_raw_markup(markdown in ".{0,200}") {
                let html = render_changelog_html(&markdown);
                prop_assert!(!html.contains('<'));
                prop_assert!(!html.contains('>'));
                prop_assert!(!html.contains('"'));
            }
        }
    }
}

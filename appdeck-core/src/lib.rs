//! AppDeck Core - Domain Types
//!
//! Records, principals, typed identifiers and the error taxonomy shared by
//! the storage and API crates. No I/O lives here.

pub mod entities;
pub mod error;
pub mod identity;
pub mod permission;

pub use entities::{
    render_changelog_html, validate_app_name, validate_version_string, Application,
    ApplicationPatch, AuditAction, AuditLog, AuditStatus, EntityKind, MemberLevel, NewApplication,
    NewAuditLog, NewMemberLevel, NewUser, NewVersion, User, Version, APP_NAME_MAX_CHARS,
    APP_NAME_MIN_CHARS,
};
pub use error::{AppdeckError, AppdeckResult, CacheError, ConfigError, StorageError, ValidationError};
pub use identity::{
    secret_fingerprint, AccountStatus, ApplicationId, AuditLogId, Identity, MemberLevelId, Role,
    ScopeStatus, TenantScope, Timestamp, UserId, VersionId,
};
pub use permission::PermissionSet;

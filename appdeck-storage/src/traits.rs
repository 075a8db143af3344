//! Store traits.
//!
//! `CredentialStore` is the narrow read-only view the authentication layer
//! needs. `PrimaryStore` is the authoritative persistence for everything the
//! cache projects. Both are object-safe so the API crate can hold them as
//! `Arc<dyn ...>` and tests can swap implementations.

use async_trait::async_trait;
use appdeck_core::{
    AppdeckResult, Application, ApplicationId, ApplicationPatch, AuditLog, MemberLevel,
    NewApplication, NewAuditLog, NewMemberLevel, NewUser, NewVersion, User, Version,
};

/// Lookups used to authenticate principals.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an operator by username, regardless of account status.
    async fn find_user_by_username(&self, username: &str) -> AppdeckResult<Option<User>>;

    /// Find the application that owns an API key, regardless of status.
    ///
    /// Callers decide what an inactive record means; returning it lets them
    /// tell an unknown key apart from a revoked one.
    async fn find_application_by_key(&self, api_key: &str) -> AppdeckResult<Option<Application>>;
}

/// Authoritative persistence for applications, versions, tiers, users and
/// audit records.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn ping(&self) -> AppdeckResult<()>;

    // === Applications ===

    /// All applications, ordered by id, without their version lists.
    async fn list_applications(&self) -> AppdeckResult<Vec<Application>>;

    /// One application with its versions populated (newest first).
    async fn get_application(&self, id: ApplicationId) -> AppdeckResult<Option<Application>>;

    async fn find_application_by_name(&self, name: &str) -> AppdeckResult<Option<Application>>;

    /// Insert an application. Fails with `AlreadyExists` on a duplicate name.
    async fn insert_application(&self, new: NewApplication) -> AppdeckResult<Application>;

    /// Apply a partial update. Fails with `NotFound` or, on a name clash,
    /// `AlreadyExists`.
    async fn update_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
    ) -> AppdeckResult<Application>;

    /// Delete an application. Fails with `Conflict` while versions exist.
    async fn delete_application(&self, id: ApplicationId) -> AppdeckResult<Application>;

    // === Versions ===

    /// Versions of one application, newest first.
    async fn list_versions(&self, app_id: ApplicationId) -> AppdeckResult<Vec<Version>>;

    /// Insert a version and advance the application's `latest_version`.
    ///
    /// Fails with `NotFound` for an unknown application and `AlreadyExists`
    /// when the version string is already published for it.
    async fn insert_version(&self, new: NewVersion) -> AppdeckResult<Version>;

    // === Member levels ===

    /// Member levels ordered by level ascending, optionally for one application.
    async fn list_member_levels(
        &self,
        app_id: Option<ApplicationId>,
    ) -> AppdeckResult<Vec<MemberLevel>>;

    /// Replace every member level with the given set.
    async fn replace_member_levels(
        &self,
        levels: Vec<NewMemberLevel>,
    ) -> AppdeckResult<Vec<MemberLevel>>;

    // === Users ===

    /// Insert an operator. Fails with `AlreadyExists` on a duplicate
    /// username or email.
    async fn insert_user(&self, new: NewUser) -> AppdeckResult<User>;

    // === Audit ===

    async fn insert_audit_log(&self, entry: NewAuditLog) -> AppdeckResult<AuditLog>;

    /// Most recent audit entries first, at most `limit`.
    async fn list_audit_logs(&self, limit: usize) -> AppdeckResult<Vec<AuditLog>>;
}

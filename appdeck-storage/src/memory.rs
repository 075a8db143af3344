//! In-memory store used for local runs and tests.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use appdeck_core::{
    render_changelog_html, AppdeckError, AppdeckResult, Application, ApplicationId,
    ApplicationPatch, AuditLog, AuditLogId, EntityKind, MemberLevel, MemberLevelId,
    NewApplication, NewAuditLog, NewMemberLevel, NewUser, NewVersion, ScopeStatus, StorageError,
    User, UserId, Version, VersionId,
};
use chrono::Utc;

use crate::traits::{CredentialStore, PrimaryStore};

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    applications: BTreeMap<ApplicationId, Application>,
    versions: BTreeMap<VersionId, Version>,
    member_levels: BTreeMap<MemberLevelId, MemberLevel>,
    audit_logs: BTreeMap<AuditLogId, AuditLog>,
    next_id: u64,
}

impl StoreState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn versions_of(&self, app_id: ApplicationId) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .versions
            .values()
            .filter(|v| v.app_id == app_id)
            .cloned()
            .collect();
        // Newest first; ids break ties between equal timestamps.
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        versions
    }
}

/// Thread-safe in-memory implementation of both store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppdeckResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| AppdeckError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> AppdeckResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| AppdeckError::Storage(StorageError::LockPoisoned))
    }

    /// Number of stored applications.
    pub fn application_count(&self) -> AppdeckResult<usize> {
        Ok(self.read()?.applications.len())
    }
}

fn not_found(entity: EntityKind, id: impl ToString) -> AppdeckError {
    AppdeckError::Storage(StorageError::NotFound {
        entity,
        id: id.to_string(),
    })
}

fn already_exists(entity: EntityKind, field: &str, value: &str) -> AppdeckError {
    AppdeckError::Storage(StorageError::AlreadyExists {
        entity,
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> AppdeckResult<Option<User>> {
        let state = self.read()?;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_application_by_key(&self, api_key: &str) -> AppdeckResult<Option<Application>> {
        let state = self.read()?;
        Ok(state
            .applications
            .values()
            .find(|a| a.api_key == api_key)
            .cloned())
    }
}

#[async_trait]
impl PrimaryStore for InMemoryStore {
    async fn ping(&self) -> AppdeckResult<()> {
        self.read().map(|_| ())
    }

    // === Applications ===

    async fn list_applications(&self) -> AppdeckResult<Vec<Application>> {
        let state = self.read()?;
        Ok(state.applications.values().cloned().collect())
    }

    async fn get_application(&self, id: ApplicationId) -> AppdeckResult<Option<Application>> {
        let state = self.read()?;
        Ok(state.applications.get(&id).map(|app| {
            let mut app = app.clone();
            app.versions = state.versions_of(id);
            app
        }))
    }

    async fn find_application_by_name(&self, name: &str) -> AppdeckResult<Option<Application>> {
        let state = self.read()?;
        Ok(state
            .applications
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn insert_application(&self, new: NewApplication) -> AppdeckResult<Application> {
        let mut state = self.write()?;
        if state.applications.values().any(|a| a.name == new.name) {
            return Err(already_exists(EntityKind::Application, "name", &new.name));
        }
        if state.applications.values().any(|a| a.api_key == new.api_key) {
            return Err(already_exists(EntityKind::Application, "api_key", "<redacted>"));
        }

        let now = Utc::now();
        let app = Application {
            id: ApplicationId::new(state.next_id()),
            name: new.name,
            description: new.description,
            latest_version: None,
            status: ScopeStatus::Active,
            api_key: new.api_key,
            created_at: now,
            updated_at: now,
            versions: Vec::new(),
        };
        state.applications.insert(app.id, app.clone());
        Ok(app)
    }

    async fn update_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
    ) -> AppdeckResult<Application> {
        let mut state = self.write()?;
        if let Some(name) = &patch.name {
            if state
                .applications
                .values()
                .any(|a| a.id != id && &a.name == name)
            {
                return Err(already_exists(EntityKind::Application, "name", name));
            }
        }

        let app = state
            .applications
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityKind::Application, id))?;
        if let Some(name) = patch.name {
            app.name = name;
        }
        if let Some(description) = patch.description {
            app.description = description;
        }
        if let Some(status) = patch.status {
            app.status = status;
        }
        app.updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn delete_application(&self, id: ApplicationId) -> AppdeckResult<Application> {
        let mut state = self.write()?;
        if !state.applications.contains_key(&id) {
            return Err(not_found(EntityKind::Application, id));
        }
        let version_count = state.versions.values().filter(|v| v.app_id == id).count();
        if version_count > 0 {
            return Err(AppdeckError::Storage(StorageError::Conflict {
                entity: EntityKind::Application,
                reason: format!("{} version(s) still reference it", version_count),
            }));
        }
        state.member_levels.retain(|_, level| level.app_id != id);
        state
            .applications
            .remove(&id)
            .ok_or_else(|| not_found(EntityKind::Application, id))
    }

    // === Versions ===

    async fn list_versions(&self, app_id: ApplicationId) -> AppdeckResult<Vec<Version>> {
        let state = self.read()?;
        Ok(state.versions_of(app_id))
    }

    async fn insert_version(&self, new: NewVersion) -> AppdeckResult<Version> {
        let mut state = self.write()?;
        if !state.applications.contains_key(&new.app_id) {
            return Err(not_found(EntityKind::Application, new.app_id));
        }
        if state
            .versions
            .values()
            .any(|v| v.app_id == new.app_id && v.version == new.version)
        {
            return Err(already_exists(EntityKind::Version, "version", &new.version));
        }

        let now = Utc::now();
        let version = Version {
            id: VersionId::new(state.next_id()),
            app_id: new.app_id,
            changelog_html: render_changelog_html(&new.changelog_md),
            version: new.version,
            changelog_md: new.changelog_md,
            created_at: now,
        };
        state.versions.insert(version.id, version.clone());

        if let Some(app) = state.applications.get_mut(&new.app_id) {
            app.latest_version = Some(version.version.clone());
            app.updated_at = now;
        }
        Ok(version)
    }

    // === Member levels ===

    async fn list_member_levels(
        &self,
        app_id: Option<ApplicationId>,
    ) -> AppdeckResult<Vec<MemberLevel>> {
        let state = self.read()?;
        let mut levels: Vec<MemberLevel> = state
            .member_levels
            .values()
            .filter(|l| app_id.map_or(true, |id| l.app_id == id))
            .cloned()
            .collect();
        levels.sort_by(|a, b| a.level.cmp(&b.level).then(a.id.cmp(&b.id)));
        Ok(levels)
    }

    async fn replace_member_levels(
        &self,
        levels: Vec<NewMemberLevel>,
    ) -> AppdeckResult<Vec<MemberLevel>> {
        let mut state = self.write()?;
        if let Some(missing) = levels
            .iter()
            .find(|l| !state.applications.contains_key(&l.app_id))
        {
            return Err(not_found(EntityKind::Application, missing.app_id));
        }

        state.member_levels.clear();
        let now = Utc::now();
        let mut stored = Vec::with_capacity(levels.len());
        for new in levels {
            let level = MemberLevel {
                id: MemberLevelId::new(state.next_id()),
                app_id: new.app_id,
                name: new.name,
                level: new.level,
                permissions: new.permissions,
                created_at: now,
                updated_at: now,
            };
            state.member_levels.insert(level.id, level.clone());
            stored.push(level);
        }
        stored.sort_by(|a, b| a.level.cmp(&b.level).then(a.id.cmp(&b.id)));
        Ok(stored)
    }

    // === Users ===

    async fn insert_user(&self, new: NewUser) -> AppdeckResult<User> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.username == new.username) {
            return Err(already_exists(EntityKind::User, "username", &new.username));
        }
        if state.users.values().any(|u| u.email == new.email) {
            return Err(already_exists(EntityKind::User, "email", &new.email));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            username: new.username,
            password_hash: new.password_hash,
            email: new.email,
            role: new.role,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    // === Audit ===

    async fn insert_audit_log(&self, entry: NewAuditLog) -> AppdeckResult<AuditLog> {
        let mut state = self.write()?;
        let log = AuditLog {
            id: AuditLogId::new(state.next_id()),
            user_id: entry.user_id,
            user_name: entry.user_name,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            entity_name: entry.entity_name,
            details: entry.details,
            ip_address: entry.ip_address,
            timestamp: Utc::now(),
            status: entry.status,
        };
        state.audit_logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn list_audit_logs(&self, limit: usize) -> AppdeckResult<Vec<AuditLog>> {
        let state = self.read()?;
        Ok(state
            .audit_logs
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdeck_core::{AccountStatus, AuditAction, AuditStatus, PermissionSet, Role};

    fn new_app(name: &str, key: &str) -> NewApplication {
        NewApplication {
            name: name.to_string(),
            description: String::new(),
            api_key: key.to_string(),
        }
    }

    fn new_version(app_id: ApplicationId, version: &str) -> NewVersion {
        NewVersion {
            app_id,
            version: version.to_string(),
            changelog_md: format!("release {}", version),
        }
    }

    #[tokio::test]
    async fn test_insert_application_rejects_duplicate_name() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        store.insert_application(new_app("alpha", "k1")).await?;
        let result = store.insert_application(new_app("alpha", "k2")).await;
        assert!(matches!(
            result,
            Err(AppdeckError::Storage(StorageError::AlreadyExists { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_version_updates_latest_and_orders_newest_first() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let app = store.insert_application(new_app("alpha", "k1")).await?;
        store.insert_version(new_version(app.id, "1.0.0")).await?;
        store.insert_version(new_version(app.id, "1.0.1")).await?;

        let detail = store.get_application(app.id).await?;
        let detail = detail.ok_or_else(|| not_found(EntityKind::Application, app.id))?;
        assert_eq!(detail.latest_version.as_deref(), Some("1.0.1"));
        assert_eq!(detail.versions.len(), 2);
        assert_eq!(detail.versions[0].version, "1.0.1");

        let listed = store.list_applications().await?;
        assert!(listed[0].versions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_version_rejects_duplicate_and_unknown_app() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let app = store.insert_application(new_app("alpha", "k1")).await?;
        store.insert_version(new_version(app.id, "1.0.0")).await?;

        let dup = store.insert_version(new_version(app.id, "1.0.0")).await;
        assert!(matches!(
            dup,
            Err(AppdeckError::Storage(StorageError::AlreadyExists { .. }))
        ));

        let missing = store
            .insert_version(new_version(ApplicationId::new(999), "1.0.0"))
            .await;
        assert!(matches!(
            missing,
            Err(AppdeckError::Storage(StorageError::NotFound { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_application_refused_while_versions_exist() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let app = store.insert_application(new_app("alpha", "k1")).await?;
        store.insert_version(new_version(app.id, "1.0.0")).await?;

        let result = store.delete_application(app.id).await;
        assert!(matches!(
            result,
            Err(AppdeckError::Storage(StorageError::Conflict { .. }))
        ));

        let empty = store.insert_application(new_app("beta", "k2")).await?;
        store.delete_application(empty.id).await?;
        assert_eq!(store.application_count()?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_application_by_key_returns_inactive_records() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let app = store.insert_application(new_app("alpha", "key-1")).await?;
        store
            .update_application(
                app.id,
                ApplicationPatch {
                    status: Some(ScopeStatus::Inactive),
                    ..Default::default()
                },
            )
            .await?;

        let found = store.find_application_by_key("key-1").await?;
        assert_eq!(found.map(|a| a.status), Some(ScopeStatus::Inactive));
        assert!(store.find_application_by_key("other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_member_levels_orders_by_level() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let app = store.insert_application(new_app("alpha", "k1")).await?;
        let level = |name: &str, level: u32| NewMemberLevel {
            app_id: app.id,
            name: name.to_string(),
            level,
            permissions: PermissionSet::new(),
        };

        store
            .replace_member_levels(vec![level("gold", 3), level("free", 1)])
            .await?;
        let replaced = store
            .replace_member_levels(vec![level("pro", 2), level("free", 1)])
            .await?;
        assert_eq!(replaced.len(), 2);

        let listed = store.list_member_levels(Some(app.id)).await?;
        let names: Vec<&str> = listed.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["free", "pro"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicates() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        let user = |name: &str, email: &str| NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            email: email.to_string(),
            role: Role::User,
            status: AccountStatus::Active,
        };
        store.insert_user(user("alice", "a@example.com")).await?;
        assert!(store.insert_user(user("alice", "b@example.com")).await.is_err());
        assert!(store.insert_user(user("bob", "a@example.com")).await.is_err());
        assert!(store.find_user_by_username("alice").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_logs_newest_first_with_limit() -> AppdeckResult<()> {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .insert_audit_log(NewAuditLog {
                    user_id: None,
                    user_name: format!("user{}", i),
                    action: AuditAction::Create,
                    entity_type: EntityKind::Application,
                    entity_id: None,
                    entity_name: None,
                    details: None,
                    ip_address: None,
                    status: AuditStatus::Success,
                })
                .await?;
        }
        let logs = store.list_audit_logs(3).await?;
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].user_name, "user4");
        Ok(())
    }
}

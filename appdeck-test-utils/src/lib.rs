//! AppDeck Test Utilities
//!
//! Shared test infrastructure for the AppDeck workspace:
//! - Proptest generators for identities, keys and payloads
//! - A fault-injecting cache backend
//! - Seeded store fixtures
//! - Assertions over the error taxonomy

pub use appdeck_core::{
    AccountStatus, AppdeckError, AppdeckResult, Application, ApplicationId, EntityKind, Identity,
    NewApplication, NewMemberLevel, NewUser, NewVersion, PermissionSet, Role, ScopeStatus,
    StorageError, UserId,
};
pub use appdeck_storage::{
    CacheBackend, CacheKey, InMemoryCacheBackend, InMemoryStore, Mutation, Namespace,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use appdeck_core::CacheError;
use async_trait::async_trait;

// ============================================================================
// FAULT-INJECTING CACHE BACKEND
// ============================================================================

/// In-memory cache backend that can be taken offline or slowed down.
///
/// While offline every operation fails with `CacheError::Unavailable`. A
/// configured delay is slept before every operation, which lets paused-time
/// tests drive the coordinator's timeouts.
#[derive(Debug, Default)]
pub struct FlakyCacheBackend {
    inner: InMemoryCacheBackend,
    offline: AtomicBool,
    delay_ms: AtomicU64,
    deleted: Mutex<Vec<String>>,
}

impl FlakyCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that starts offline.
    pub fn offline() -> Self {
        let backend = Self::default();
        backend.set_online(false);
        backend
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Every key or pattern passed to `delete`/`delete_pattern`, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Direct access to stored payloads, bypassing faults.
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.ok().flatten()
    }

    async fn before_op(&self) -> Result<(), CacheError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "backend offline".to_string(),
            });
        }
        Ok(())
    }

    fn record_delete(&self, key: &str) {
        if let Ok(mut log) = self.deleted.lock() {
            log.push(key.to_string());
        }
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.before_op().await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.before_op().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.before_op().await?;
        self.record_delete(key);
        self.inner.delete(key).await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.before_op().await?;
        self.record_delete(pattern);
        self.inner.delete_pattern(pattern).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.before_op().await
    }

    async fn approx_size(&self, pattern: &str) -> Result<u64, CacheError> {
        self.before_op().await?;
        self.inner.approx_size(pattern).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for AppDeck types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_application_id() -> impl Strategy<Value = ApplicationId> {
        any::<u64>().prop_map(ApplicationId::new)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        any::<u64>().prop_map(UserId::new)
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::User)]
    }

    /// Display names, including non-ASCII ones.
    pub fn arb_display_name() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_\\-\\. àéü漢字]{1,32}"
    }

    /// An active operator identity.
    pub fn arb_identity() -> impl Strategy<Value = Identity> {
        (arb_user_id(), arb_display_name(), arb_role()).prop_map(|(id, name, role)| Identity {
            subject_id: id,
            display_name: name,
            role,
            account_status: AccountStatus::Active,
        })
    }

    pub fn arb_namespace() -> impl Strategy<Value = Namespace> {
        prop_oneof![
            Just(Namespace::AppList),
            Just(Namespace::AppDetail),
            Just(Namespace::Versions),
            Just(Namespace::MemberLevels),
        ]
    }

    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        prop_oneof![
            arb_namespace().prop_map(CacheKey::list),
            (arb_namespace(), 0u64..10_000).prop_map(|(ns, id)| CacheKey::entity(ns, id)),
        ]
    }

    pub fn arb_mutation() -> impl Strategy<Value = Mutation> {
        let id = (1u64..10_000).prop_map(ApplicationId::new);
        prop_oneof![
            id.clone().prop_map(Mutation::CreateApplication),
            id.clone().prop_map(Mutation::UpdateApplication),
            id.clone().prop_map(Mutation::DeleteApplication),
            id.prop_map(|app_id| Mutation::CreateVersion { app_id }),
            Just(Mutation::UpdateMemberLevels),
            Just(Mutation::ClearAll),
        ]
    }

    /// Version strings of the form `x.y.z`.
    pub fn arb_version_string() -> impl Strategy<Value = String> {
        (0u32..100, 0u32..100, 0u32..1000).prop_map(|(a, b, c)| format!("{}.{}.{}", a, b, c))
    }

    pub fn arb_permission_name() -> impl Strategy<Value = String> {
        "[a-z0-9_.:-]{1,64}"
    }

    pub fn arb_permission_set() -> impl Strategy<Value = PermissionSet> {
        (
            prop::collection::btree_set(arb_permission_name(), 0..6),
            prop::collection::btree_map(arb_permission_name(), any::<u64>(), 0..4),
        )
            .prop_map(|(features, limits)| PermissionSet { features, limits })
    }

    /// Opaque non-empty payload bytes.
    pub fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 1..256)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built identities and seeded stores.

    use super::*;
    use appdeck_storage::PrimaryStore;

    pub const ACTIVE_APP_KEY: &str =
        "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";
    pub const INACTIVE_APP_KEY: &str =
        "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

    pub fn admin_identity() -> Identity {
        Identity {
            subject_id: UserId::new(1),
            display_name: "admin".to_string(),
            role: Role::Admin,
            account_status: AccountStatus::Active,
        }
    }

    pub fn user_identity() -> Identity {
        Identity {
            subject_id: UserId::new(2),
            display_name: "operator".to_string(),
            role: Role::User,
            account_status: AccountStatus::Active,
        }
    }

    pub fn disabled_identity() -> Identity {
        Identity {
            account_status: AccountStatus::Disabled,
            ..user_identity()
        }
    }

    /// Store holding one active and one inactive application.
    pub struct SeededStore {
        pub store: InMemoryStore,
        pub active_app: Application,
        pub inactive_app: Application,
    }

    pub async fn seeded_store() -> AppdeckResult<SeededStore> {
        let store = InMemoryStore::new();
        let active_app = store
            .insert_application(NewApplication {
                name: "Notes".to_string(),
                description: "Note taking".to_string(),
                api_key: ACTIVE_APP_KEY.to_string(),
            })
            .await?;
        let retired = store
            .insert_application(NewApplication {
                name: "Legacy".to_string(),
                description: "Retired client".to_string(),
                api_key: INACTIVE_APP_KEY.to_string(),
            })
            .await?;
        let inactive_app = store
            .update_application(
                retired.id,
                appdeck_core::ApplicationPatch {
                    status: Some(ScopeStatus::Inactive),
                    ..Default::default()
                },
            )
            .await?;
        Ok(SeededStore {
            store,
            active_app,
            inactive_app,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over `AppdeckResult` variants.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &AppdeckResult<T>, entity: EntityKind) {
        match result {
            Err(AppdeckError::Storage(StorageError::NotFound { entity: e, .. })) => {
                assert_eq!(*e, entity, "Wrong entity kind in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity, other),
        }
    }

    #[track_caller]
    pub fn assert_already_exists<T: std::fmt::Debug>(result: &AppdeckResult<T>, field: &str) {
        match result {
            Err(AppdeckError::Storage(StorageError::AlreadyExists { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in AlreadyExists error");
            }
            other => panic!("Expected AlreadyExists on {}, got: {:?}", field, other),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &AppdeckResult<T>) {
        match result {
            Err(AppdeckError::Storage(StorageError::Conflict { .. })) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &AppdeckResult<T>) {
        match result {
            Err(AppdeckError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}

//! Cache-aside wrapper over the primary store.
//!
//! Reads check the cache first and fill it from the primary store on a miss.
//! Writes go to the primary store, then apply the mutation's invalidation
//! set before returning, so a response that acknowledges a write is never
//! followed by a read of the pre-write projection.
//!
//! Handlers use this for everything that has a cached projection. Audit logs
//! and user records go straight to the store.

use std::sync::Arc;

use appdeck_core::{
    AppdeckResult, Application, ApplicationId, ApplicationPatch, EntityKind, MemberLevel,
    NewApplication, NewMemberLevel, NewVersion, StorageError, Version,
};
use appdeck_storage::{CacheCoordinator, CacheKey, CacheStatistics, Mutation, PrimaryStore};

use crate::telemetry::METRICS;

#[derive(Clone)]
pub struct CachedStore {
    store: Arc<dyn PrimaryStore>,
    cache: CacheCoordinator,
}

impl std::fmt::Debug for CachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStore")
            .field("cache_enabled", &self.cache.is_enabled())
            .finish_non_exhaustive()
    }
}

impl CachedStore {
    pub fn new(store: Arc<dyn PrimaryStore>, cache: CacheCoordinator) -> Self {
        Self { store, cache }
    }

    /// Underlying primary store, for uncached operations.
    pub fn store(&self) -> &Arc<dyn PrimaryStore> {
        &self.store
    }

    pub fn cache(&self) -> &CacheCoordinator {
        &self.cache
    }

    async fn commit(&self, mutation: Mutation) {
        self.cache.apply(&mutation).await;
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_invalidation(mutation.as_str());
        }
    }

    // === Applications ===

    pub async fn list_applications(&self) -> AppdeckResult<Vec<Application>> {
        let store = self.store.clone();
        self.cache
            .read_through(&CacheKey::app_list(), || async move {
                store.list_applications().await
            })
            .await
    }

    /// Application with its versions attached.
    pub async fn get_application(&self, id: ApplicationId) -> AppdeckResult<Application> {
        let store = self.store.clone();
        self.cache
            .read_through(&CacheKey::app_detail(id), || async move {
                let mut app = store
                    .get_application(id)
                    .await?
                    .ok_or_else(|| application_not_found(id))?;
                app.versions = store.list_versions(id).await?;
                Ok(app)
            })
            .await
    }

    pub async fn create_application(&self, new: NewApplication) -> AppdeckResult<Application> {
        let app = self.store.insert_application(new).await?;
        self.commit(Mutation::CreateApplication(app.id)).await;
        Ok(app)
    }

    pub async fn update_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
    ) -> AppdeckResult<Application> {
        let app = self.store.update_application(id, patch).await?;
        self.commit(Mutation::UpdateApplication(id)).await;
        Ok(app)
    }

    pub async fn delete_application(&self, id: ApplicationId) -> AppdeckResult<Application> {
        let app = self.store.delete_application(id).await?;
        self.commit(Mutation::DeleteApplication(id)).await;
        Ok(app)
    }

    // === Versions ===

    /// Versions of an existing application, newest first.
    pub async fn list_versions(&self, app_id: ApplicationId) -> AppdeckResult<Vec<Version>> {
        let store = self.store.clone();
        self.cache
            .read_through(&CacheKey::versions(app_id), || async move {
                if store.get_application(app_id).await?.is_none() {
                    return Err(application_not_found(app_id));
                }
                store.list_versions(app_id).await
            })
            .await
    }

    pub async fn create_version(&self, new: NewVersion) -> AppdeckResult<Version> {
        let app_id = new.app_id;
        let version = self.store.insert_version(new).await?;
        self.commit(Mutation::CreateVersion { app_id }).await;
        Ok(version)
    }

    // === Member levels ===

    pub async fn list_member_levels(
        &self,
        app_id: Option<ApplicationId>,
    ) -> AppdeckResult<Vec<MemberLevel>> {
        let key = match app_id {
            Some(id) => CacheKey::member_levels_for(id),
            None => CacheKey::member_levels(),
        };
        let store = self.store.clone();
        self.cache
            .read_through(&key, || async move { store.list_member_levels(app_id).await })
            .await
    }

    pub async fn replace_member_levels(
        &self,
        levels: Vec<NewMemberLevel>,
    ) -> AppdeckResult<Vec<MemberLevel>> {
        let stored = self.store.replace_member_levels(levels).await?;
        self.commit(Mutation::UpdateMemberLevels).await;
        Ok(stored)
    }

    // === Cache administration ===

    pub async fn clear_cache(&self) {
        self.commit(Mutation::ClearAll).await;
    }

    pub async fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics().await
    }
}

fn application_not_found(id: ApplicationId) -> appdeck_core::AppdeckError {
    StorageError::NotFound {
        entity: EntityKind::Application,
        id: id.to_string(),
    }
    .into()
}

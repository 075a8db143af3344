//! Per-application API keys for external callers.

use std::sync::Arc;

use appdeck_core::{secret_fingerprint, TenantScope};
use appdeck_storage::CredentialStore;
use rand::Rng;

use super::{AuthError, KeyRejection};

/// Header carrying a tenant API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Bytes of entropy in a generated key.
const API_KEY_BYTES: usize = 32;

/// Generate a new application API key: 32 random bytes, hex-encoded.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Resolves an API key to the application it is bound to.
///
/// Every call consults the credential store; nothing is cached, so
/// deactivating or deleting an application revokes its key immediately.
#[derive(Clone)]
pub struct TenantKeyGate {
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for TenantKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantKeyGate").finish_non_exhaustive()
    }
}

impl TenantKeyGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn authorize(&self, api_key: Option<&str>) -> Result<TenantScope, AuthError> {
        let key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AuthError::MissingKey),
        };

        let record = self
            .store
            .find_application_by_key(key)
            .await
            .map_err(|e| AuthError::CredentialStoreUnavailable {
                reason: e.to_string(),
            })?;

        let rejection = match record {
            Some(app) if app.status.is_active() => {
                return Ok(TenantScope {
                    tenant_id: app.id,
                    tenant_name: app.name,
                    scope_status: app.status,
                });
            }
            Some(app) => {
                tracing::warn!(
                    target: "appdeck::audit",
                    event = "tenant_key_rejected",
                    reason = KeyRejection::InactiveTenant.as_str(),
                    key_fingerprint = %secret_fingerprint(key),
                    tenant_id = %app.id,
                    "API key belongs to an inactive application"
                );
                KeyRejection::InactiveTenant
            }
            None => {
                tracing::warn!(
                    target: "appdeck::audit",
                    event = "tenant_key_rejected",
                    reason = KeyRejection::UnknownKey.as_str(),
                    key_fingerprint = %secret_fingerprint(key),
                    "API key matches no application"
                );
                KeyRejection::UnknownKey
            }
        };
        Err(AuthError::InvalidKey(rejection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdeck_core::{AppdeckResult, ApplicationPatch, ScopeStatus, StorageError, User};
    use appdeck_storage::{InMemoryStore, PrimaryStore};
    use async_trait::async_trait;

    struct UnavailableStore;

    #[async_trait]
    impl CredentialStore for UnavailableStore {
        async fn find_user_by_username(&self, _username: &str) -> AppdeckResult<Option<User>> {
            Err(StorageError::Unavailable {
                reason: "connection refused".to_string(),
            }
            .into())
        }

        async fn find_application_by_key(
            &self,
            _api_key: &str,
        ) -> AppdeckResult<Option<appdeck_core::Application>> {
            Err(StorageError::Unavailable {
                reason: "connection refused".to_string(),
            }
            .into())
        }
    }

    async fn store_with_app(key: &str) -> AppdeckResult<(Arc<InMemoryStore>, appdeck_core::Application)> {
        let store = Arc::new(InMemoryStore::new());
        let app = store
            .insert_application(appdeck_core::NewApplication {
                name: "Notes".to_string(),
                description: String::new(),
                api_key: key.to_string(),
            })
            .await?;
        Ok((store, app))
    }

    #[test]
    fn test_generated_keys_are_64_hex_chars() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[tokio::test]
    async fn test_active_key_resolves_scope() -> AppdeckResult<()> {
        let key = generate_api_key();
        let (store, app) = store_with_app(&key).await?;
        let gate = TenantKeyGate::new(store);

        let scope = gate.authorize(Some(&key)).await;
        assert_eq!(
            scope,
            Ok(TenantScope {
                tenant_id: app.id,
                tenant_name: "Notes".to_string(),
                scope_status: ScopeStatus::Active,
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_and_blank_keys() {
        let gate = TenantKeyGate::new(Arc::new(InMemoryStore::new()));
        assert_eq!(gate.authorize(None).await, Err(AuthError::MissingKey));
        assert_eq!(gate.authorize(Some("  ")).await, Err(AuthError::MissingKey));
    }

    #[tokio::test]
    async fn test_unknown_key_rejected() {
        let gate = TenantKeyGate::new(Arc::new(InMemoryStore::new()));
        assert_eq!(
            gate.authorize(Some("deadbeef")).await,
            Err(AuthError::InvalidKey(KeyRejection::UnknownKey))
        );
    }

    #[tokio::test]
    async fn test_deactivation_revokes_immediately() -> AppdeckResult<()> {
        let key = generate_api_key();
        let (store, app) = store_with_app(&key).await?;
        let gate = TenantKeyGate::new(store.clone());
        assert!(gate.authorize(Some(&key)).await.is_ok());

        store
            .update_application(
                app.id,
                ApplicationPatch {
                    status: Some(ScopeStatus::Inactive),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!(
            gate.authorize(Some(&key)).await,
            Err(AuthError::InvalidKey(KeyRejection::InactiveTenant))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let gate = TenantKeyGate::new(Arc::new(UnavailableStore));
        assert!(matches!(
            gate.authorize(Some("abc")).await,
            Err(AuthError::CredentialStoreUnavailable { .. })
        ));
    }
}

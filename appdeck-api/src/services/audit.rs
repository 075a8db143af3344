//! Best-effort audit trail.
//!
//! Recording never fails the request that triggered it: a store error is
//! logged and the entry is dropped.

use std::sync::Arc;

use appdeck_core::{AuditAction, AuditStatus, EntityKind, Identity, NewAuditLog};
use appdeck_storage::PrimaryStore;

/// One audit entry under construction.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    inner: NewAuditLog,
}

impl AuditEntry {
    /// Entry attributed to an authenticated operator.
    pub fn by(actor: &Identity, action: AuditAction, entity_type: EntityKind) -> Self {
        Self {
            inner: NewAuditLog {
                user_id: Some(actor.subject_id),
                user_name: actor.display_name.clone(),
                action,
                entity_type,
                entity_id: None,
                entity_name: None,
                details: None,
                ip_address: None,
                status: AuditStatus::Success,
            },
        }
    }

    /// Entry for a caller that has no session yet (login, registration).
    pub fn anonymous(user_name: impl Into<String>, action: AuditAction, entity_type: EntityKind) -> Self {
        Self {
            inner: NewAuditLog {
                user_id: None,
                user_name: user_name.into(),
                action,
                entity_type,
                entity_id: None,
                entity_name: None,
                details: None,
                ip_address: None,
                status: AuditStatus::Success,
            },
        }
    }

    pub fn entity(mut self, id: impl ToString, name: impl Into<String>) -> Self {
        self.inner.entity_id = Some(id.to_string());
        self.inner.entity_name = Some(name.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.inner.details = Some(details.into());
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.inner.ip_address = ip;
        self
    }

    pub fn failed(mut self) -> Self {
        self.inner.status = AuditStatus::Failure;
        self
    }

    pub fn into_record(self) -> NewAuditLog {
        self.inner
    }
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn PrimaryStore>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn PrimaryStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: AuditEntry) {
        let record = entry.into_record();
        let action = record.action;
        let entity_type = record.entity_type;
        if let Err(e) = self.store.insert_audit_log(record).await {
            tracing::warn!(
                error = %e,
                action = ?action,
                entity_type = %entity_type,
                "Failed to record audit entry"
            );
        }
    }
}

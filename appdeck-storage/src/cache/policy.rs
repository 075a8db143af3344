//! TTL classes and the mutation fan-out table.

use std::time::Duration;

use appdeck_core::ApplicationId;

use super::key::{CacheKey, KeyPattern, Namespace};

/// Lifetimes per namespace class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Collections: application list and version lists.
    pub list: Duration,
    /// Single records: application detail.
    pub detail: Duration,
    /// Configuration-like data: member levels.
    pub config: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(5 * 60),
            detail: Duration::from_secs(10 * 60),
            config: Duration::from_secs(30 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::AppList | Namespace::Versions => self.list,
            Namespace::AppDetail => self.detail,
            Namespace::MemberLevels => self.config,
        }
    }
}

/// A write to primary storage that stales cached projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateApplication(ApplicationId),
    UpdateApplication(ApplicationId),
    DeleteApplication(ApplicationId),
    CreateVersion { app_id: ApplicationId },
    UpdateMemberLevels,
    ClearAll,
}

impl Mutation {
    /// Every pattern whose cached value may be stale after this mutation.
    pub fn invalidation_set(&self) -> Vec<KeyPattern> {
        match *self {
            Mutation::CreateApplication(id) | Mutation::UpdateApplication(id) => vec![
                KeyPattern::Exact(CacheKey::app_list()),
                KeyPattern::Exact(CacheKey::app_detail(id)),
            ],
            Mutation::DeleteApplication(id) => vec![
                KeyPattern::Exact(CacheKey::app_list()),
                KeyPattern::Exact(CacheKey::app_detail(id)),
                KeyPattern::Exact(CacheKey::versions(id)),
                KeyPattern::Exact(CacheKey::member_levels_for(id)),
                KeyPattern::Exact(CacheKey::member_levels()),
            ],
            // The list carries latest_version, so it goes stale too.
            Mutation::CreateVersion { app_id } => vec![
                KeyPattern::Exact(CacheKey::app_list()),
                KeyPattern::Exact(CacheKey::app_detail(app_id)),
                KeyPattern::Exact(CacheKey::versions(app_id)),
            ],
            Mutation::UpdateMemberLevels => vec![KeyPattern::Namespace(Namespace::MemberLevels)],
            Mutation::ClearAll => vec![KeyPattern::All],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::CreateApplication(_) => "create_application",
            Mutation::UpdateApplication(_) => "update_application",
            Mutation::DeleteApplication(_) => "delete_application",
            Mutation::CreateVersion { .. } => "create_version",
            Mutation::UpdateMemberLevels => "update_member_levels",
            Mutation::ClearAll => "clear_all",
        }
    }
}

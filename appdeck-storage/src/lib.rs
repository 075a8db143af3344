//! AppDeck Storage - Store Traits, In-Memory Store and Cache Coordination
//!
//! The primary store is authoritative; the cache only ever holds projections
//! of it. Callers mutate the primary store first and then apply the
//! mutation's invalidation set before responding.

pub mod cache;
pub mod memory;
pub mod traits;

pub use cache::{
    CacheBackend, CacheCoordinator, CacheKey, CacheMode, CacheStatistics, CoordinatorConfig,
    InMemoryCacheBackend, KeyPattern, Mutation, Namespace, RedisCacheBackend, TtlPolicy,
    DEFAULT_KEY_PREFIX,
};
pub use memory::InMemoryStore;
pub use traits::{CredentialStore, PrimaryStore};

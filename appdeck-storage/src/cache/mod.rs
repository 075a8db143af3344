//! Cache-aside layer in front of the primary store.
//!
//! Keys are built only through [`CacheKey`]; every mutation maps to a static
//! set of [`KeyPattern`]s through [`Mutation`]. The [`CacheCoordinator`] owns
//! the backend and never lets a cache failure reach its caller: a broken,
//! slow or absent backend simply reads as a miss.
//!
//! # Example
//!
//! ```ignore
//! let cache = CacheCoordinator::connect(backend, CoordinatorConfig::default()).await;
//!
//! let apps: Vec<Application> = cache
//!     .read_through(&CacheKey::app_list(), || store.list_applications())
//!     .await?;
//!
//! // After the primary store commits:
//! cache.apply(&Mutation::CreateApplication(app.id)).await;
//! ```

pub mod backend;
pub mod coordinator;
pub mod key;
pub mod memory_backend;
pub mod policy;
pub mod redis_backend;

pub use backend::CacheBackend;
pub use coordinator::{CacheCoordinator, CacheMode, CacheStatistics, CoordinatorConfig};
pub use key::{CacheKey, KeyPattern, Namespace, DEFAULT_KEY_PREFIX};
pub use memory_backend::InMemoryCacheBackend;
pub use policy::{Mutation, TtlPolicy};
pub use redis_backend::RedisCacheBackend;

//! Grantry Store - grant store implementations
//!
//! - [`InMemoryPermissionStore`] / [`InMemoryDynamicPermissionStore`]:
//!   process-local stores for tests and single-node deployments
//! - [`CachedPermissionStore`]: read-through cache over any store

pub mod cached;
pub mod memory;


pub use cached::{CacheInvalidationHandler, CacheMetrics, CachedPermissionStore, CachedStoreConfig};
pub use memory::{InMemoryDynamicPermissionStore, InMemoryPermissionStore};

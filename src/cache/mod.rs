//! Generic caching layer for remote query results.
//!
//! This module provides a gateway-agnostic caching mechanism that:
//! - Caches query results under (family, parameter-hash) keys
//! - Applies a per-query freshness window before refetching
//! - Coalesces concurrent identical fetches into a single network call
//! - Retains the last good value when a refresh fails (stale-while-error)
//! - Supports invalidation per key or per family after mutations

mod coalesce;
mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey};

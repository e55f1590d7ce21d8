//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Bound for values that can pass through the cache.
///
/// Entries are stored as serialized JSON, so anything serde-round-trippable
/// qualifies.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {}

impl<T> Cacheable for T where T: Clone + Send + Sync + Serialize + DeserializeOwned {}

/// A query descriptor that identifies one cache entry.
///
/// Two descriptors with identical family and parameters must hash to the same
/// key; any differing parameter must produce a different key. The family tag
/// groups entries so that a mutation can invalidate every entry of a family
/// without enumerating parameter combinations.
pub trait QueryKey {
  /// Entity family this query belongs to (e.g. "fountains", "alerts").
  fn family(&self) -> &'static str;

  /// Stable hash over family + all filter parameters.
  fn cache_hash(&self) -> String;

  /// Human-readable description for logging.
  fn description(&self) -> String;

  /// How long a cached value for this query stays fresh.
  ///
  /// A zero duration means the value is always considered stale and every
  /// access refetches (concurrent accesses still coalesce into one call).
  fn freshness(&self) -> Duration;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
  /// Message from the most recent failed refresh, if any.
  ///
  /// Set together with retained data: the previous good value stays visible
  /// while the error is reported alongside it.
  pub error: Option<String>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
      error: None,
    }
  }

  /// Create a new cache result from cached data within its freshness window.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
      error: None,
    }
  }

  /// Create a result that retains the last good value after a failed refresh.
  pub fn stale_error(data: T, cached_at: DateTime<Utc>, error: String) -> Self {
    Self {
      data,
      source: CacheSource::StaleError,
      cached_at: Some(cached_at),
      error: Some(error),
    }
  }

  /// True when the most recent refresh of this entry failed.
  #[allow(dead_code)]
  pub fn is_errored(&self) -> bool {
    self.error.is_some()
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its freshness window
  CacheFresh,
  /// Last refresh failed; serving the previous good value
  StaleError,
}

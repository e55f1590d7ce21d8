//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::coalesce::FlightTable;
use super::storage::{CacheStorage, StoredEntry};
use super::traits::{CacheResult, Cacheable, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client. Reads go
/// through [`CacheLayer::fetch`]; only the mutation dispatcher calls the
/// invalidation methods.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  flights: Arc<FlightTable>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      flights: Arc::new(FlightTable::new()),
    }
  }

  /// Fetch a value with cache-first strategy and request coalescing.
  ///
  /// 1. If the cached value is within the key's freshness window, return it.
  /// 2. Otherwise wait on the key's flight lock. If the fetch we waited on
  ///    stored a value or a failure, return that outcome without a second
  ///    network call.
  /// 3. Otherwise perform the fetch ourselves and store the outcome.
  ///
  /// A failed fetch never evicts a previously cached value: the failure is
  /// recorded on the entry and the old value is returned alongside the error
  /// message. Only a never-loaded key surfaces a failure as `Err`.
  pub async fn fetch<T, K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let family = key.family();
    let hash = key.cache_hash();

    // Fast path: fresh cache hit, no lock needed.
    if let Some(entry) = self.storage.get(family, &hash)? {
      if let Some(bytes) = &entry.data {
        if !self.is_stale(key, entry.cached_at) {
          debug!(query = %key.description(), "cache hit");
          return Ok(CacheResult::from_cache(decode(bytes)?, entry.cached_at));
        }
      }
    }

    let started = Utc::now();
    let _flight = self.flights.acquire(&flight_key(family, &hash)).await;

    // A fetch for this key may have completed while we waited on the lock.
    // Its outcome, value or failure, is ours too.
    if let Some(entry) = self.storage.get(family, &hash)? {
      if let Some(err) = &entry.last_error {
        if err.failed_at >= started {
          return match decode_entry(&entry)? {
            Some(data) => Ok(CacheResult::stale_error(
              data,
              entry.cached_at,
              err.message.clone(),
            )),
            None => Err(eyre!("{}", err.message)),
          };
        }
      }
      if let Some(bytes) = &entry.data {
        if entry.cached_at >= started || !self.is_stale(key, entry.cached_at) {
          return Ok(CacheResult::from_cache(decode(bytes)?, entry.cached_at));
        }
      }
    }

    // We are the flight leader: perform the single network call.
    debug!(query = %key.description(), "cache miss, fetching");
    match fetcher().await {
      Ok(data) => {
        let bytes = serde_json::to_vec(&data)
          .map_err(|e| eyre!("Failed to serialize cache entry: {}", e))?;
        self.storage.put(family, &hash, bytes)?;
        Ok(CacheResult::from_network(data))
      }
      Err(e) => {
        let message = e.to_string();
        warn!(query = %key.description(), error = %message, "fetch failed");
        self.storage.record_failure(family, &hash, &message)?;

        match self.storage.get(family, &hash)? {
          Some(entry) => match decode_entry(&entry)? {
            Some(data) => Ok(CacheResult::stale_error(data, entry.cached_at, message)),
            None => Err(e),
          },
          None => Err(e),
        }
      }
    }
  }

  /// Drop the entry for one exact query. The next read refetches.
  #[allow(dead_code)]
  pub fn invalidate<K: QueryKey>(&self, key: &K) -> Result<()> {
    debug!(query = %key.description(), "invalidating cache entry");
    self.storage.remove(key.family(), &key.cache_hash())
  }

  /// Drop every entry of a family. The next read of any query in the family
  /// refetches.
  pub fn invalidate_family(&self, family: &'static str) -> Result<()> {
    debug!(family, "invalidating cache family");
    self.storage.remove_family(family)
  }

  fn is_stale<K: QueryKey>(&self, key: &K, cached_at: DateTime<Utc>) -> bool {
    Utc::now() - cached_at > key.freshness()
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      flights: Arc::clone(&self.flights),
    }
  }
}

fn flight_key(family: &str, hash: &str) -> String {
  format!("{}:{}", family, hash)
}

fn decode<T: Cacheable>(bytes: &[u8]) -> Result<T> {
  serde_json::from_slice(bytes).map_err(|e| eyre!("Failed to deserialize cache entry: {}", e))
}

fn decode_entry<T: Cacheable>(entry: &StoredEntry) -> Result<Option<T>> {
  match &entry.data {
    Some(bytes) => Ok(Some(decode(bytes)?)),
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::super::storage::MemoryStorage;
  use super::super::traits::CacheSource;
  use super::*;
  use chrono::Duration;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct TestKey {
    name: &'static str,
    freshness: Duration,
  }

  impl TestKey {
    fn fresh(name: &'static str) -> Self {
      Self {
        name,
        freshness: Duration::seconds(30),
      }
    }

    fn always_stale(name: &'static str) -> Self {
      Self {
        name,
        freshness: Duration::zero(),
      }
    }
  }

  impl QueryKey for TestKey {
    fn family(&self) -> &'static str {
      "test"
    }

    fn cache_hash(&self) -> String {
      self.name.to_string()
    }

    fn description(&self) -> String {
      self.name.to_string()
    }

    fn freshness(&self) -> Duration {
      self.freshness
    }
  }

  fn layer() -> CacheLayer<MemoryStorage> {
    CacheLayer::new(MemoryStorage::new())
  }

  #[tokio::test]
  async fn test_second_read_within_window_hits_cache() {
    let cache = layer();
    let calls = AtomicU32::new(0);
    let key = TestKey::fresh("list");

    for _ in 0..2 {
      let result = cache
        .fetch(&key, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, color_eyre::Report>(vec![1, 2, 3])
        })
        .await
        .unwrap();
      assert_eq!(result.data, vec![1, 2, 3]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_refetches_once() {
    let cache = layer();
    let calls = AtomicU32::new(0);
    let key = TestKey::always_stale("detail");

    for _ in 0..2 {
      cache
        .fetch(&key, || async {
          Ok::<_, color_eyre::Report>(calls.fetch_add(1, Ordering::SeqCst))
        })
        .await
        .unwrap();
    }

    // Zero freshness window: every sequential access refetches.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_concurrent_reads_coalesce_into_one_call() {
    let cache = layer();
    let calls = std::sync::Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = std::sync::Arc::clone(&calls);
      || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok::<_, color_eyre::Report>(42u32)
      }
    };

    let key_a = TestKey::fresh("concurrent");
    let key_b = TestKey::fresh("concurrent");
    let (a, b) = tokio::join!(cache.fetch(&key_a, fetcher()), cache.fetch(&key_b, fetcher()));

    assert_eq!(a.unwrap().data, 42);
    assert_eq!(b.unwrap().data, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_the_same_failure() {
    let cache = layer();
    let calls = std::sync::Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = std::sync::Arc::clone(&calls);
      || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Err::<u32, _>(eyre!("gateway unreachable"))
      }
    };

    let key_a = TestKey::fresh("failing");
    let key_b = TestKey::fresh("failing");
    let (a, b) = tokio::join!(cache.fetch(&key_a, fetcher()), cache.fetch(&key_b, fetcher()));

    assert_eq!(a.unwrap_err().to_string(), "gateway unreachable");
    assert_eq!(b.unwrap_err().to_string(), "gateway unreachable");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_previous_value() {
    let cache = layer();
    let key = TestKey::always_stale("stale-error");

    cache
      .fetch(&key, || async {
        Ok::<_, color_eyre::Report>(vec!["good".to_string()])
      })
      .await
      .unwrap();

    let result = cache
      .fetch(&key, || async {
        Err::<Vec<String>, _>(eyre!("network down"))
      })
      .await
      .unwrap();

    assert_eq!(result.data, vec!["good".to_string()]);
    assert_eq!(result.source, CacheSource::StaleError);
    assert_eq!(result.error.as_deref(), Some("network down"));
  }

  #[tokio::test]
  async fn test_never_loaded_failure_is_an_error() {
    let cache = layer();
    let key = TestKey::fresh("cold");

    let result = cache
      .fetch(&key, || async { Err::<u32, _>(eyre!("refused")) })
      .await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_invalidation_forces_refetch() {
    let cache = layer();
    let calls = AtomicU32::new(0);
    let key = TestKey::fresh("inval");

    for _ in 0..2 {
      cache
        .fetch(&key, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, color_eyre::Report>(7u32)
        })
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate_family("test").unwrap();
    cache
      .fetch(&key, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, color_eyre::Report>(7u32)
      })
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_recovery_after_failure() {
    let cache = layer();
    let key = TestKey::always_stale("recover");

    cache
      .fetch(&key, || async { Ok::<_, color_eyre::Report>(1u32) })
      .await
      .unwrap();
    cache
      .fetch(&key, || async { Err::<u32, _>(eyre!("blip")) })
      .await
      .unwrap();

    let result = cache
      .fetch(&key, || async { Ok::<_, color_eyre::Report>(2u32) })
      .await
      .unwrap();

    assert_eq!(result.data, 2);
    assert!(result.error.is_none());
  }
}

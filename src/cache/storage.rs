//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// A failure recorded against a cache entry.
///
/// Kept next to (never instead of) the last good value so that callers can
/// distinguish "never loaded" from "loaded, but the last refresh failed", and
/// so that coalesced waiters observe the same failure as the fetch they
/// waited on.
#[derive(Debug, Clone)]
pub struct FetchFailure {
  pub message: String,
  pub failed_at: DateTime<Utc>,
}

/// One stored cache entry: serialized value plus bookkeeping.
#[derive(Debug, Clone)]
pub struct StoredEntry {
  /// Serialized JSON of the cached value, if a fetch has ever succeeded.
  pub data: Option<Vec<u8>>,
  /// When the value in `data` was stored.
  pub cached_at: DateTime<Utc>,
  /// Most recent failed refresh, cleared on the next successful store.
  pub last_error: Option<FetchFailure>,
}

/// Trait for cache storage backends.
///
/// Entries are addressed by (family, hash): the hash identifies one exact
/// query, the family groups every query over the same entity so mutations can
/// invalidate all of them at once.
pub trait CacheStorage: Send + Sync {
  /// Get the entry for a key, if any.
  fn get(&self, family: &str, hash: &str) -> Result<Option<StoredEntry>>;

  /// Store a successfully fetched value, clearing any recorded failure.
  fn put(&self, family: &str, hash: &str, data: Vec<u8>) -> Result<()>;

  /// Record a failed refresh without touching any previously stored value.
  fn record_failure(&self, family: &str, hash: &str, message: &str) -> Result<()>;

  /// Remove one entry.
  fn remove(&self, family: &str, hash: &str) -> Result<()>;

  /// Remove every entry of a family.
  fn remove_family(&self, family: &str) -> Result<()>;
}

/// In-memory cache storage.
///
/// Process-wide and transient: created at application start, gone at
/// shutdown. The Gateway is the source of truth, so nothing here needs to
/// outlive the run.
pub struct MemoryStorage {
  entries: Mutex<HashMap<(String, String), StoredEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), StoredEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Cache lock poisoned: {}", e))
  }
}

impl Default for MemoryStorage {
  fn default() -> Self {
    Self::new()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, family: &str, hash: &str) -> Result<Option<StoredEntry>> {
    let entries = self.lock()?;
    Ok(entries.get(&(family.to_string(), hash.to_string())).cloned())
  }

  fn put(&self, family: &str, hash: &str, data: Vec<u8>) -> Result<()> {
    let mut entries = self.lock()?;
    entries.insert(
      (family.to_string(), hash.to_string()),
      StoredEntry {
        data: Some(data),
        cached_at: Utc::now(),
        last_error: None,
      },
    );
    Ok(())
  }

  fn record_failure(&self, family: &str, hash: &str, message: &str) -> Result<()> {
    let mut entries = self.lock()?;
    let failure = FetchFailure {
      message: message.to_string(),
      failed_at: Utc::now(),
    };

    entries
      .entry((family.to_string(), hash.to_string()))
      .and_modify(|e| e.last_error = Some(failure.clone()))
      .or_insert_with(|| StoredEntry {
        data: None,
        cached_at: Utc::now(),
        last_error: Some(failure),
      });
    Ok(())
  }

  fn remove(&self, family: &str, hash: &str) -> Result<()> {
    let mut entries = self.lock()?;
    entries.remove(&(family.to_string(), hash.to_string()));
    Ok(())
  }

  fn remove_family(&self, family: &str) -> Result<()> {
    let mut entries = self.lock()?;
    entries.retain(|(f, _), _| f != family);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_put_then_get() {
    let storage = MemoryStorage::new();
    storage.put("fountains", "abc", b"[1,2]".to_vec()).unwrap();

    let entry = storage.get("fountains", "abc").unwrap().unwrap();
    assert_eq!(entry.data.as_deref(), Some(b"[1,2]".as_slice()));
    assert!(entry.last_error.is_none());
  }

  #[test]
  fn test_failure_keeps_data() {
    let storage = MemoryStorage::new();
    storage.put("alerts", "k", b"[]".to_vec()).unwrap();
    storage.record_failure("alerts", "k", "boom").unwrap();

    let entry = storage.get("alerts", "k").unwrap().unwrap();
    assert_eq!(entry.data.as_deref(), Some(b"[]".as_slice()));
    assert_eq!(entry.last_error.unwrap().message, "boom");
  }

  #[test]
  fn test_put_clears_failure() {
    let storage = MemoryStorage::new();
    storage.record_failure("alerts", "k", "boom").unwrap();
    storage.put("alerts", "k", b"[]".to_vec()).unwrap();

    let entry = storage.get("alerts", "k").unwrap().unwrap();
    assert!(entry.last_error.is_none());
  }

  #[test]
  fn test_remove_family_leaves_other_families() {
    let storage = MemoryStorage::new();
    storage.put("fountains", "a", b"1".to_vec()).unwrap();
    storage.put("fountains", "b", b"2".to_vec()).unwrap();
    storage.put("alerts", "a", b"3".to_vec()).unwrap();

    storage.remove_family("fountains").unwrap();

    assert!(storage.get("fountains", "a").unwrap().is_none());
    assert!(storage.get("fountains", "b").unwrap().is_none());
    assert!(storage.get("alerts", "a").unwrap().is_some());
  }
}

//! Per-key coalescing of in-flight fetches.
//!
//! Concurrent requests for the same cache key must issue at most one network
//! call. The first caller to acquire a key's flight lock performs the fetch;
//! the rest wait on the same lock and then read the outcome (value or
//! recorded failure) from storage.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-key async locks guarding in-flight fetches.
pub struct FlightTable {
  inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlightTable {
  pub fn new() -> Self {
    Self {
      inflight: Mutex::new(HashMap::new()),
    }
  }

  /// Acquire the flight lock for `key`, waiting behind any fetch already in
  /// progress for the same key.
  pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
    let lock = {
      let mut inflight = self.inflight.lock().await;
      Arc::clone(
        inflight
          .entry(key.to_string())
          .or_insert_with(|| Arc::new(Mutex::new(()))),
      )
    };
    lock.lock_owned().await
  }
}

impl Default for FlightTable {
  fn default() -> Self {
    Self::new()
  }
}

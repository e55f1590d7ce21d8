//! Async query abstraction for data fetching in views.
//!
//! A `Query<T>` encapsulates one async data source, its loading state, and
//! its last error. Unlike a plain result, a failed refresh keeps the
//! previous value visible: `data()` and `error()` can both be set at once,
//! and `is_loading()` is true only while nothing has ever been loaded.
//!
//! # Example
//!
//! ```ignore
//! let gateway = gateway.clone();
//! let mut query = Query::new(move || {
//!     let gateway = gateway.clone();
//!     async move {
//!         gateway.fountains().await
//!             .map(|r| r.data)
//!             .map_err(|e| e.to_string())
//!     }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query with loading/error state and stale-while-error retention.
pub struct Query<T> {
  data: Option<T>,
  error: Option<String>,
  fetching: bool,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      data: None,
      error: None,
      fetching: false,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60), // Default 1 minute
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, `is_stale()` returns true and the next tick can
  /// refresh in the background.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Get the data from the most recent successful fetch.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  /// Get the error message from the most recent failed fetch, if the most
  /// recent fetch failed. Previously loaded data stays available.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// True only while no data exists yet and a fetch is in flight.
  pub fn is_loading(&self) -> bool {
    self.fetching && self.data.is_none()
  }

  /// True while any fetch is in flight, including background refreshes.
  pub fn is_fetching(&self) -> bool {
    self.fetching
  }

  /// Check if the data is stale (older than stale_time).
  pub fn is_stale(&self) -> bool {
    match self.data {
      Some(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      None => false,
    }
  }

  /// Start fetching data if not already fetching.
  pub fn fetch(&mut self) {
    if self.fetching {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already fetching.
  pub fn refetch(&mut self) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch();
  }

  /// Refresh in the background when the data has gone stale. Call on tick.
  pub fn refresh_if_stale(&mut self) {
    if self.is_stale() && !self.fetching {
      self.start_fetch();
    }
  }

  /// Seed the query with a known value, as if a fetch had just succeeded.
  /// Used when fresher data arrives out of band (a realtime push).
  pub fn prime(&mut self, data: T) {
    self.data = Some(data);
    self.error = None;
    self.fetched_at = Some(Instant::now());
  }

  /// Mutate loaded data in place; no-op when nothing has loaded yet.
  pub fn mutate(&mut self, f: impl FnOnce(&mut T)) {
    if let Some(data) = &mut self.data {
      f(data);
    }
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.data = Some(data);
        self.error = None;
        self.fetching = false;
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        // Keep the previous value; only the error flag changes.
        self.error = Some(error);
        self.fetching = false;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.error = Some("Query was cancelled".to_string());
        self.fetching = false;
        self.receiver = None;
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.fetching = true;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("data", &self.data)
      .field("error", &self.error)
      .field("fetching", &self.fetching)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(query.data().is_none());

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(!query.is_loading());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
    assert!(query.error().is_none());
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.error(), Some("Something went wrong"));
    assert!(query.data().is_none());
  }

  #[tokio::test]
  async fn test_failed_refetch_keeps_previous_data() {
    let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let attempts_clone = attempts.clone();

    let mut query = Query::new(move || {
      let attempts = attempts_clone.clone();
      async move {
        match attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) {
          0 => Ok(7),
          _ => Err("refresh failed".to_string()),
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&7));

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    // The error is visible alongside the retained value.
    assert_eq!(query.data(), Some(&7));
    assert_eq!(query.error(), Some("refresh failed"));
    assert!(!query.is_loading());
  }

  #[tokio::test]
  async fn test_loading_only_before_first_data() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(30)).await;
      Ok::<_, String>(1)
    });

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(50)).await;
    query.poll();
    assert!(!query.is_loading());

    // A background refresh is fetching but not "loading".
    query.refetch();
    assert!(query.is_fetching());
    assert!(!query.is_loading());
  }

  #[tokio::test]
  async fn test_query_stale() {
    let mut query = Query::new(|| async { Ok::<_, String>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    // With zero stale time, should immediately be stale
    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_fetching_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_fetching());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_fetching());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch should have completed and been received
    assert_eq!(query.data(), Some(&1));
  }
}

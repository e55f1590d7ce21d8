//! Cached gateway client that wraps GatewayClient with transparent caching.

use color_eyre::Result;
use std::time::Duration;

use crate::cache::{CacheLayer, CacheResult, MemoryStorage};

use super::cache::GatewayQueryKey;
use super::client::GatewayClient;
use super::realtime::{self, ReadingStream};
use super::types::{Alert, DashboardStats, Fountain, MaintenanceSchedule, SensorReading};

/// Gateway client with transparent read caching.
///
/// Wraps the underlying [`GatewayClient`] and provides the same read API,
/// routed through the cache layer: fresh entries are served without a network
/// call, concurrent identical reads coalesce, and a failed refresh keeps the
/// previous value visible. Writes live on the mutation dispatcher, which
/// shares this cache so it can invalidate what a write affects.
#[derive(Clone)]
pub struct CachedGatewayClient {
  inner: GatewayClient,
  cache: CacheLayer<MemoryStorage>,
}

impl CachedGatewayClient {
  /// Wrap a gateway client with a fresh process-wide cache.
  pub fn new(inner: GatewayClient) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(MemoryStorage::new()),
    }
  }

  /// The cache shared between reads and the mutation dispatcher.
  pub fn cache(&self) -> CacheLayer<MemoryStorage> {
    self.cache.clone()
  }

  /// The uncached client, for collaborators that bypass the cache (realtime
  /// follower, mutation dispatcher).
  pub fn raw(&self) -> GatewayClient {
    self.inner.clone()
  }

  /// All fountains ordered by name.
  pub async fn fountains(&self) -> Result<CacheResult<Vec<Fountain>>> {
    let key = GatewayQueryKey::Fountains;
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.list_fountains().await }
      })
      .await
  }

  /// One fountain by id; `None` means the record does not exist, which is
  /// distinct from a fetch error.
  pub async fn fountain(&self, id: &str) -> Result<CacheResult<Option<Fountain>>> {
    let key = GatewayQueryKey::FountainDetail { id: id.to_string() };
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.get_fountain(&id).await }
      })
      .await
  }

  /// Sensor readings over the lookback window, optionally per fountain.
  pub async fn readings(
    &self,
    fountain_id: Option<&str>,
    hours: u32,
  ) -> Result<CacheResult<Vec<SensorReading>>> {
    let key = GatewayQueryKey::ReadingSeries {
      fountain_id: fountain_id.map(String::from),
      hours,
    };
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        let fountain_id = fountain_id.map(String::from);
        async move { inner.list_readings(fountain_id.as_deref(), hours).await }
      })
      .await
  }

  /// Most recent reading for one fountain.
  pub async fn latest_reading(
    &self,
    fountain_id: &str,
  ) -> Result<CacheResult<Option<SensorReading>>> {
    let key = GatewayQueryKey::LatestReading {
      fountain_id: fountain_id.to_string(),
    };
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        let fountain_id = fountain_id.to_string();
        async move { inner.latest_reading(&fountain_id).await }
      })
      .await
  }

  /// Maintenance schedules, optionally per fountain.
  pub async fn schedules(
    &self,
    fountain_id: Option<&str>,
  ) -> Result<CacheResult<Vec<MaintenanceSchedule>>> {
    let key = GatewayQueryKey::Schedules {
      fountain_id: fountain_id.map(String::from),
    };
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        let fountain_id = fountain_id.map(String::from);
        async move { inner.list_schedules(fountain_id.as_deref()).await }
      })
      .await
  }

  /// Alerts, optionally filtered by resolution state.
  pub async fn alerts(&self, resolved: Option<bool>) -> Result<CacheResult<Vec<Alert>>> {
    let key = GatewayQueryKey::Alerts { resolved };
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.list_alerts(resolved).await }
      })
      .await
  }

  /// Aggregated dashboard counts.
  pub async fn dashboard_stats(&self) -> Result<CacheResult<DashboardStats>> {
    let key = GatewayQueryKey::DashboardStats;
    self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.dashboard_stats().await }
      })
      .await
  }

  /// Subscribe to readings inserted for one fountain. Bypasses the cache:
  /// the stream is live data, not a cached query.
  pub fn subscribe_readings(&self, fountain_id: &str) -> ReadingStream {
    realtime::subscribe(
      self.inner.clone(),
      fountain_id.to_string(),
      Duration::from_secs(5),
    )
  }
}

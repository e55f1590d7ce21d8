//! Query descriptors for gateway reads.
//!
//! Each variant names one query family plus its filter parameters. The hash
//! is what the cache stores under; the freshness window follows the family's
//! write/observation frequency (the busier the family, the shorter the
//! window).

use chrono::Duration;
use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

/// Cache family tags, shared with the mutation dispatcher for invalidation.
pub const FAMILY_FOUNTAINS: &str = "fountains";
pub const FAMILY_READINGS: &str = "sensor_readings";
pub const FAMILY_SCHEDULES: &str = "maintenance_schedules";
pub const FAMILY_ALERTS: &str = "alerts";
pub const FAMILY_STATS: &str = "dashboard_stats";

/// Query key types for gateway reads.
#[derive(Clone, Debug)]
pub enum GatewayQueryKey {
  /// All fountains ordered by name
  Fountains,
  /// A single fountain record
  FountainDetail { id: String },
  /// Sensor-reading series over a lookback window, optionally per fountain
  ReadingSeries {
    fountain_id: Option<String>,
    hours: u32,
  },
  /// Most recent reading for one fountain
  LatestReading { fountain_id: String },
  /// Maintenance schedules, optionally per fountain
  Schedules { fountain_id: Option<String> },
  /// Alerts, optionally filtered by resolution state
  Alerts { resolved: Option<bool> },
  /// Aggregated dashboard counts
  DashboardStats,
}

impl QueryKey for GatewayQueryKey {
  fn family(&self) -> &'static str {
    match self {
      Self::Fountains | Self::FountainDetail { .. } => FAMILY_FOUNTAINS,
      Self::ReadingSeries { .. } | Self::LatestReading { .. } => FAMILY_READINGS,
      Self::Schedules { .. } => FAMILY_SCHEDULES,
      Self::Alerts { .. } => FAMILY_ALERTS,
      Self::DashboardStats => FAMILY_STATS,
    }
  }

  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Fountains => "fountains".to_string(),
      Self::FountainDetail { id } => format!("fountain_detail:{}", id),
      Self::ReadingSeries { fountain_id, hours } => format!(
        "reading_series:{}:{}",
        fountain_id.as_deref().unwrap_or(""),
        hours
      ),
      Self::LatestReading { fountain_id } => format!("latest_reading:{}", fountain_id),
      Self::Schedules { fountain_id } => {
        format!("schedules:{}", fountain_id.as_deref().unwrap_or(""))
      }
      Self::Alerts { resolved } => format!(
        "alerts:{}",
        resolved.map(|r| r.to_string()).unwrap_or_default()
      ),
      Self::DashboardStats => "dashboard_stats".to_string(),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::Fountains => "fountains".to_string(),
      Self::FountainDetail { id } => format!("fountain {}", id),
      Self::ReadingSeries { fountain_id, hours } => match fountain_id {
        Some(id) => format!("readings for {} over {}h", id, hours),
        None => format!("readings over {}h", hours),
      },
      Self::LatestReading { fountain_id } => format!("latest reading for {}", fountain_id),
      Self::Schedules { fountain_id } => match fountain_id {
        Some(id) => format!("schedules for {}", id),
        None => "all schedules".to_string(),
      },
      Self::Alerts { resolved } => match resolved {
        Some(true) => "resolved alerts".to_string(),
        Some(false) => "open alerts".to_string(),
        None => "all alerts".to_string(),
      },
      Self::DashboardStats => "dashboard stats".to_string(),
    }
  }

  fn freshness(&self) -> Duration {
    match self {
      Self::Fountains => Duration::seconds(30),
      // Always refetched; the record is cheap and edits must show up at once
      Self::FountainDetail { .. } => Duration::zero(),
      Self::ReadingSeries { .. } => Duration::seconds(10),
      Self::LatestReading { .. } => Duration::seconds(5),
      Self::Schedules { .. } => Duration::seconds(60),
      Self::Alerts { .. } => Duration::seconds(15),
      Self::DashboardStats => Duration::seconds(30),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identical_parameters_collide() {
    let a = GatewayQueryKey::ReadingSeries {
      fountain_id: Some("f1".to_string()),
      hours: 24,
    };
    let b = GatewayQueryKey::ReadingSeries {
      fountain_id: Some("f1".to_string()),
      hours: 24,
    };
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_differing_parameters_never_collide() {
    let base = GatewayQueryKey::ReadingSeries {
      fountain_id: Some("f1".to_string()),
      hours: 24,
    };
    let other_fountain = GatewayQueryKey::ReadingSeries {
      fountain_id: Some("f2".to_string()),
      hours: 24,
    };
    let other_window = GatewayQueryKey::ReadingSeries {
      fountain_id: Some("f1".to_string()),
      hours: 48,
    };
    let unfiltered = GatewayQueryKey::ReadingSeries {
      fountain_id: None,
      hours: 24,
    };

    assert_ne!(base.cache_hash(), other_fountain.cache_hash());
    assert_ne!(base.cache_hash(), other_window.cache_hash());
    assert_ne!(base.cache_hash(), unfiltered.cache_hash());
  }

  #[test]
  fn test_alert_filters_are_distinct() {
    let all = GatewayQueryKey::Alerts { resolved: None };
    let open = GatewayQueryKey::Alerts {
      resolved: Some(false),
    };
    let resolved = GatewayQueryKey::Alerts {
      resolved: Some(true),
    };

    assert_ne!(all.cache_hash(), open.cache_hash());
    assert_ne!(all.cache_hash(), resolved.cache_hash());
    assert_ne!(open.cache_hash(), resolved.cache_hash());
  }

  #[test]
  fn test_list_and_detail_share_the_fountains_family() {
    let list = GatewayQueryKey::Fountains;
    let detail = GatewayQueryKey::FountainDetail {
      id: "f1".to_string(),
    };

    assert_eq!(list.family(), FAMILY_FOUNTAINS);
    assert_eq!(detail.family(), FAMILY_FOUNTAINS);
    assert_ne!(list.cache_hash(), detail.cache_hash());
  }

  #[test]
  fn test_freshness_windows() {
    assert_eq!(GatewayQueryKey::Fountains.freshness(), Duration::seconds(30));
    assert_eq!(
      GatewayQueryKey::FountainDetail {
        id: "f1".to_string()
      }
      .freshness(),
      Duration::zero()
    );
    assert_eq!(
      GatewayQueryKey::LatestReading {
        fountain_id: "f1".to_string()
      }
      .freshness(),
      Duration::seconds(5)
    );
    assert_eq!(
      GatewayQueryKey::Schedules { fountain_id: None }.freshness(),
      Duration::seconds(60)
    );
  }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status of a fountain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FountainStatus {
  Active,
  Inactive,
  Maintenance,
  Error,
}

impl FountainStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Inactive => "inactive",
      Self::Maintenance => "maintenance",
      Self::Error => "error",
    }
  }
}

impl fmt::Display for FountainStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A monitored fountain installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fountain {
  pub id: String,
  pub name: String,
  pub location: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub status: FountainStatus,
  pub installation_date: NaiveDate,
  pub last_maintenance_date: Option<NaiveDate>,
  pub next_maintenance_date: Option<NaiveDate>,
  pub water_flow_rate: Option<f64>,
  pub pressure_rating: Option<f64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One point in a fountain's append-only sensor time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
  pub id: String,
  pub fountain_id: String,
  pub flow_rate: Option<f64>,
  pub pressure: Option<f64>,
  pub temperature: Option<f64>,
  pub ph_level: Option<f64>,
  pub battery_level: Option<f64>,
  pub water_quality_score: Option<f64>,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
  Routine,
  Repair,
  Inspection,
  Cleaning,
}

impl MaintenanceType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Routine => "routine",
      Self::Repair => "repair",
      Self::Inspection => "inspection",
      Self::Cleaning => "cleaning",
    }
  }
}

impl fmt::Display for MaintenanceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
  Scheduled,
  InProgress,
  Completed,
  Cancelled,
}

impl ScheduleStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for ScheduleStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A planned or historical maintenance visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
  pub id: String,
  pub fountain_id: String,
  pub maintenance_type: MaintenanceType,
  pub scheduled_date: NaiveDate,
  pub completed_date: Option<NaiveDate>,
  pub status: ScheduleStatus,
  pub description: Option<String>,
  pub technician_notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
  Leak,
  LowBattery,
  HighPressure,
  LowFlow,
  WaterQuality,
  MaintenanceDue,
}

impl AlertType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Leak => "leak",
      Self::LowBattery => "low_battery",
      Self::HighPressure => "high_pressure",
      Self::LowFlow => "low_flow",
      Self::WaterQuality => "water_quality",
      Self::MaintenanceDue => "maintenance_due",
    }
  }
}

impl fmt::Display for AlertType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An operational alert, optionally tied to one fountain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
  pub id: String,
  pub fountain_id: Option<String>,
  pub alert_type: AlertType,
  pub severity: Severity,
  pub title: String,
  pub description: Option<String>,
  pub is_resolved: bool,
  pub resolved_at: Option<DateTime<Utc>>,
  pub resolved_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Aggregated counts for the overview dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DashboardStats {
  pub total_fountains: u64,
  pub active_fountains: u64,
  pub unresolved_alerts: u64,
  pub upcoming_maintenance: u64,
}

/// Partial update for a fountain; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FountainUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<FountainStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_maintenance_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_maintenance_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub water_flow_rate: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pressure_rating: Option<f64>,
}

impl FountainUpdate {
  pub fn status(status: FountainStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }
}

/// Fields for a new maintenance schedule; the server assigns id and
/// timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct NewMaintenanceSchedule {
  pub fountain_id: String,
  pub maintenance_type: MaintenanceType,
  pub scheduled_date: NaiveDate,
  pub status: ScheduleStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub technician_notes: Option<String>,
}

//! Serde-deserializable types matching gateway row payloads.
//!
//! Rows are parsed into these tolerant shapes first, then validated into the
//! domain types. A malformed row (unknown enumeration value, empty identity)
//! is rejected as a gateway error instead of leaking partial data into the
//! cache.

use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Deserialize};

use super::types::{
  Alert, AlertType, Fountain, FountainStatus, MaintenanceSchedule, MaintenanceType,
  ScheduleStatus, Severity, SensorReading,
};

/// Parse an enumeration value the same way serde would, with a gateway-error
/// message naming the offending value.
fn parse_enum<T: DeserializeOwned>(kind: &str, raw: &str) -> Result<T> {
  serde_json::from_value(serde_json::Value::String(raw.to_string()))
    .map_err(|_| eyre!("Gateway returned unknown {} '{}'", kind, raw))
}

fn require_id(family: &str, id: &str) -> Result<String> {
  if id.is_empty() {
    return Err(eyre!("Gateway returned {} row without id", family));
  }
  Ok(id.to_string())
}

/// Convert a batch of rows, failing on the first malformed one.
pub fn parse_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
  R: TryInto<T, Error = color_eyre::Report>,
{
  rows.into_iter().map(TryInto::try_into).collect()
}

// ============================================================================
// Fountains
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFountainRow {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub location: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  #[serde(default)]
  pub status: String,
  pub installation_date: NaiveDate,
  pub last_maintenance_date: Option<NaiveDate>,
  pub next_maintenance_date: Option<NaiveDate>,
  pub water_flow_rate: Option<f64>,
  pub pressure_rating: Option<f64>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApiFountainRow> for Fountain {
  type Error = color_eyre::Report;

  fn try_from(row: ApiFountainRow) -> Result<Self> {
    Ok(Fountain {
      id: require_id("fountain", &row.id)?,
      name: row.name,
      location: row.location,
      latitude: row.latitude,
      longitude: row.longitude,
      status: parse_enum::<FountainStatus>("fountain status", &row.status)?,
      installation_date: row.installation_date,
      last_maintenance_date: row.last_maintenance_date,
      next_maintenance_date: row.next_maintenance_date,
      water_flow_rate: row.water_flow_rate,
      pressure_rating: row.pressure_rating,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

// ============================================================================
// Sensor readings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSensorReadingRow {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub fountain_id: String,
  pub flow_rate: Option<f64>,
  pub pressure: Option<f64>,
  pub temperature: Option<f64>,
  pub ph_level: Option<f64>,
  pub battery_level: Option<f64>,
  pub water_quality_score: Option<f64>,
  pub recorded_at: DateTime<Utc>,
}

impl TryFrom<ApiSensorReadingRow> for SensorReading {
  type Error = color_eyre::Report;

  fn try_from(row: ApiSensorReadingRow) -> Result<Self> {
    Ok(SensorReading {
      id: require_id("sensor reading", &row.id)?,
      fountain_id: require_id("sensor reading", &row.fountain_id)?,
      flow_rate: row.flow_rate,
      pressure: row.pressure,
      temperature: row.temperature,
      ph_level: row.ph_level,
      battery_level: row.battery_level,
      water_quality_score: row.water_quality_score,
      recorded_at: row.recorded_at,
    })
  }
}

// ============================================================================
// Maintenance schedules
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMaintenanceScheduleRow {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub fountain_id: String,
  #[serde(default)]
  pub maintenance_type: String,
  pub scheduled_date: NaiveDate,
  pub completed_date: Option<NaiveDate>,
  #[serde(default)]
  pub status: String,
  pub description: Option<String>,
  pub technician_notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApiMaintenanceScheduleRow> for MaintenanceSchedule {
  type Error = color_eyre::Report;

  fn try_from(row: ApiMaintenanceScheduleRow) -> Result<Self> {
    Ok(MaintenanceSchedule {
      id: require_id("maintenance schedule", &row.id)?,
      fountain_id: require_id("maintenance schedule", &row.fountain_id)?,
      maintenance_type: parse_enum::<MaintenanceType>("maintenance type", &row.maintenance_type)?,
      scheduled_date: row.scheduled_date,
      completed_date: row.completed_date,
      status: parse_enum::<ScheduleStatus>("schedule status", &row.status)?,
      description: row.description,
      technician_notes: row.technician_notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiAlertRow {
  #[serde(default)]
  pub id: String,
  pub fountain_id: Option<String>,
  #[serde(default)]
  pub alert_type: String,
  #[serde(default)]
  pub severity: String,
  #[serde(default)]
  pub title: String,
  pub description: Option<String>,
  #[serde(default)]
  pub is_resolved: bool,
  pub resolved_at: Option<DateTime<Utc>>,
  pub resolved_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApiAlertRow> for Alert {
  type Error = color_eyre::Report;

  fn try_from(row: ApiAlertRow) -> Result<Self> {
    Ok(Alert {
      id: require_id("alert", &row.id)?,
      fountain_id: row.fountain_id,
      alert_type: parse_enum::<AlertType>("alert type", &row.alert_type)?,
      severity: parse_enum::<Severity>("alert severity", &row.severity)?,
      title: row.title,
      description: row.description,
      is_resolved: row.is_resolved,
      resolved_at: row.resolved_at,
      resolved_by: row.resolved_by,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fountain_json(status: &str) -> serde_json::Value {
    serde_json::json!({
      "id": "f1",
      "name": "Central Plaza",
      "location": "Main Square",
      "latitude": 41.88,
      "longitude": -87.62,
      "status": status,
      "installation_date": "2022-04-01",
      "last_maintenance_date": null,
      "next_maintenance_date": "2026-09-01",
      "water_flow_rate": 118.5,
      "pressure_rating": 85.2,
      "created_at": "2022-04-01T12:00:00Z",
      "updated_at": "2026-08-01T08:30:00Z"
    })
  }

  #[test]
  fn test_valid_fountain_row_parses() {
    let row: ApiFountainRow = serde_json::from_value(fountain_json("maintenance")).unwrap();
    let fountain = Fountain::try_from(row).unwrap();

    assert_eq!(fountain.id, "f1");
    assert_eq!(fountain.status, FountainStatus::Maintenance);
    assert_eq!(fountain.last_maintenance_date, None);
  }

  #[test]
  fn test_unknown_status_is_rejected() {
    let row: ApiFountainRow = serde_json::from_value(fountain_json("exploded")).unwrap();
    let err = Fountain::try_from(row).unwrap_err();
    assert!(err.to_string().contains("exploded"));
  }

  #[test]
  fn test_missing_id_is_rejected() {
    let mut value = fountain_json("active");
    value["id"] = serde_json::Value::String(String::new());
    let row: ApiFountainRow = serde_json::from_value(value).unwrap();
    assert!(Fountain::try_from(row).is_err());
  }

  #[test]
  fn test_alert_row_round_trip() {
    let row: ApiAlertRow = serde_json::from_value(serde_json::json!({
      "id": "a1",
      "fountain_id": "f1",
      "alert_type": "low_battery",
      "severity": "critical",
      "title": "Battery at 5%",
      "description": null,
      "is_resolved": false,
      "resolved_at": null,
      "resolved_by": null,
      "created_at": "2026-08-01T08:30:00Z",
      "updated_at": "2026-08-01T08:30:00Z"
    }))
    .unwrap();

    let alert = Alert::try_from(row).unwrap();
    assert_eq!(alert.alert_type, AlertType::LowBattery);
    assert_eq!(alert.severity, Severity::Critical);
    assert!(!alert.is_resolved);
  }

  #[test]
  fn test_parse_rows_fails_on_first_bad_row() {
    let rows: Vec<ApiFountainRow> = vec![
      serde_json::from_value(fountain_json("active")).unwrap(),
      serde_json::from_value(fountain_json("bogus")).unwrap(),
    ];
    let result: Result<Vec<Fountain>> = parse_rows(rows);
    assert!(result.is_err());
  }
}

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::gateway::api_types::{
  parse_rows, ApiAlertRow, ApiFountainRow, ApiMaintenanceScheduleRow, ApiSensorReadingRow,
};
use crate::gateway::types::{
  Alert, DashboardStats, Fountain, FountainUpdate, MaintenanceSchedule, NewMaintenanceSchedule,
  SensorReading,
};

/// Typed client for the hosted data gateway's REST interface.
///
/// The gateway owns persistence, filtering, ordering and count aggregation;
/// this client only shapes requests and validates rows on the way in.
#[derive(Clone)]
pub struct GatewayClient {
  http: reqwest::Client,
  base: Url,
}

impl GatewayClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_gateway_key()?;
    Self::from_parts(&config.gateway.url, &api_key)
  }

  /// Build a client against an explicit base URL and API key.
  pub fn from_parts(base_url: &str, api_key: &str) -> Result<Self> {
    let base = Url::parse(base_url)
      .map_err(|e| eyre!("Invalid gateway URL '{}': {}", base_url, e))?;

    let mut headers = HeaderMap::new();
    let key_value = HeaderValue::from_str(api_key)
      .map_err(|e| eyre!("Gateway API key is not a valid header value: {}", e))?;
    headers.insert("apikey", key_value);
    let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
      .map_err(|e| eyre!("Gateway API key is not a valid header value: {}", e))?;
    headers.insert(reqwest::header::AUTHORIZATION, bearer);

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create gateway client: {}", e))?;

    Ok(Self { http, base })
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    self
      .base
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Failed to build gateway URL for {}: {}", table, e))
  }

  async fn select<R: DeserializeOwned>(
    &self,
    table: &str,
    params: &[(&str, String)],
  ) -> Result<Vec<R>> {
    let mut url = self.table_url(table)?;
    url.query_pairs_mut().append_pair("select", "*");
    for (name, value) in params {
      url.query_pairs_mut().append_pair(name, value);
    }

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to query {}: {}", table, e))?;

    let response = check_status(table, response).await?;
    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse {} rows: {}", table, e))
  }

  /// Count rows matching the given filters, without fetching them.
  async fn count(&self, table: &str, params: &[(&str, String)]) -> Result<u64> {
    let mut url = self.table_url(table)?;
    url.query_pairs_mut().append_pair("select", "id");
    for (name, value) in params {
      url.query_pairs_mut().append_pair(name, value);
    }

    let response = self
      .http
      .get(url)
      .header("Prefer", "count=exact")
      .header("Range", "0-0")
      .send()
      .await
      .map_err(|e| eyre!("Failed to count {}: {}", table, e))?;

    let response = check_status(table, response).await?;

    // Total comes back in Content-Range, e.g. "0-0/57" or "*/0".
    let content_range = response
      .headers()
      .get(reqwest::header::CONTENT_RANGE)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| eyre!("Gateway count for {} returned no Content-Range", table))?;

    parse_content_range_total(content_range)
      .ok_or_else(|| eyre!("Unparseable Content-Range '{}' for {}", content_range, table))
  }

  // --------------------------------------------------------------------------
  // Reads
  // --------------------------------------------------------------------------

  /// All fountains, ordered by display name.
  pub async fn list_fountains(&self) -> Result<Vec<Fountain>> {
    let rows: Vec<ApiFountainRow> = self
      .select("fountains", &[("order", "name.asc".to_string())])
      .await?;
    parse_rows(rows)
  }

  /// A single fountain by id; `None` when no such row exists.
  pub async fn get_fountain(&self, id: &str) -> Result<Option<Fountain>> {
    let rows: Vec<ApiFountainRow> = self
      .select(
        "fountains",
        &[("id", format!("eq.{}", id)), ("limit", "1".to_string())],
      )
      .await?;
    rows.into_iter().next().map(Fountain::try_from).transpose()
  }

  /// Sensor readings within the lookback window, newest first, optionally
  /// restricted to one fountain.
  pub async fn list_readings(
    &self,
    fountain_id: Option<&str>,
    hours: u32,
  ) -> Result<Vec<SensorReading>> {
    let cutoff = Utc::now() - Duration::hours(i64::from(hours));
    let mut params = vec![
      ("recorded_at", format!("gte.{}", cutoff.to_rfc3339())),
      ("order", "recorded_at.desc".to_string()),
    ];
    if let Some(id) = fountain_id {
      params.push(("fountain_id", format!("eq.{}", id)));
    }

    let rows: Vec<ApiSensorReadingRow> = self.select("sensor_readings", &params).await?;
    parse_rows(rows)
  }

  /// Most recent reading for one fountain; `None` when it has never reported.
  pub async fn latest_reading(&self, fountain_id: &str) -> Result<Option<SensorReading>> {
    let rows: Vec<ApiSensorReadingRow> = self
      .select(
        "sensor_readings",
        &[
          ("fountain_id", format!("eq.{}", fountain_id)),
          ("order", "recorded_at.desc".to_string()),
          ("limit", "1".to_string()),
        ],
      )
      .await?;
    rows
      .into_iter()
      .next()
      .map(SensorReading::try_from)
      .transpose()
  }

  /// Readings for one fountain recorded strictly after `since`, oldest first.
  /// Used by the realtime follower to tail the append-only series.
  pub async fn readings_since(
    &self,
    fountain_id: &str,
    since: DateTime<Utc>,
  ) -> Result<Vec<SensorReading>> {
    let rows: Vec<ApiSensorReadingRow> = self
      .select(
        "sensor_readings",
        &[
          ("fountain_id", format!("eq.{}", fountain_id)),
          ("recorded_at", format!("gt.{}", since.to_rfc3339())),
          ("order", "recorded_at.asc".to_string()),
        ],
      )
      .await?;
    parse_rows(rows)
  }

  /// Maintenance schedules ordered by scheduled date, optionally restricted
  /// to one fountain.
  pub async fn list_schedules(
    &self,
    fountain_id: Option<&str>,
  ) -> Result<Vec<MaintenanceSchedule>> {
    let mut params = vec![("order", "scheduled_date.asc".to_string())];
    if let Some(id) = fountain_id {
      params.push(("fountain_id", format!("eq.{}", id)));
    }

    let rows: Vec<ApiMaintenanceScheduleRow> =
      self.select("maintenance_schedules", &params).await?;
    parse_rows(rows)
  }

  /// Alerts, newest first, optionally filtered by resolution state.
  pub async fn list_alerts(&self, resolved: Option<bool>) -> Result<Vec<Alert>> {
    let mut params = vec![("order", "created_at.desc".to_string())];
    if let Some(resolved) = resolved {
      params.push(("is_resolved", format!("eq.{}", resolved)));
    }

    let rows: Vec<ApiAlertRow> = self.select("alerts", &params).await?;
    parse_rows(rows)
  }

  /// Aggregated counts for the overview dashboard. The four counts are
  /// independent, so they run concurrently.
  pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
    let today = Utc::now().date_naive();

    let active_params = [("status", "eq.active".to_string())];
    let alerts_params = [("is_resolved", "eq.false".to_string())];
    let maintenance_params = [
      ("status", "eq.scheduled".to_string()),
      ("scheduled_date", format!("gte.{}", today)),
    ];

    let (total_fountains, active_fountains, unresolved_alerts, upcoming_maintenance) =
      futures::try_join!(
        self.count("fountains", &[]),
        self.count("fountains", &active_params),
        self.count("alerts", &alerts_params),
        self.count("maintenance_schedules", &maintenance_params),
      )?;

    Ok(DashboardStats {
      total_fountains,
      active_fountains,
      unresolved_alerts,
      upcoming_maintenance,
    })
  }

  // --------------------------------------------------------------------------
  // Writes
  // --------------------------------------------------------------------------

  /// Apply a partial update to a fountain, returning the canonical written
  /// record.
  pub async fn update_fountain(&self, id: &str, update: &FountainUpdate) -> Result<Fountain> {
    let mut url = self.table_url("fountains")?;
    url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

    let response = self
      .http
      .patch(url)
      .header("Prefer", "return=representation")
      .json(update)
      .send()
      .await
      .map_err(|e| eyre!("Failed to update fountain {}: {}", id, e))?;

    let response = check_status("fountains", response).await?;
    let rows: Vec<ApiFountainRow> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse updated fountain: {}", e))?;

    rows
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Fountain {} not found", id))?
      .try_into()
  }

  /// Mark an alert resolved, recording who resolved it and when.
  pub async fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<Alert> {
    let mut url = self.table_url("alerts")?;
    url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

    let body = serde_json::json!({
      "is_resolved": true,
      "resolved_at": Utc::now().to_rfc3339(),
      "resolved_by": resolved_by,
    });

    let response = self
      .http
      .patch(url)
      .header("Prefer", "return=representation")
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to resolve alert {}: {}", id, e))?;

    let response = check_status("alerts", response).await?;
    let rows: Vec<ApiAlertRow> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse resolved alert: {}", e))?;

    rows
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Alert {} not found", id))?
      .try_into()
  }

  /// Insert a new maintenance schedule, returning the server-assigned record.
  pub async fn insert_schedule(
    &self,
    schedule: &NewMaintenanceSchedule,
  ) -> Result<MaintenanceSchedule> {
    let url = self.table_url("maintenance_schedules")?;

    let response = self
      .http
      .post(url)
      .header("Prefer", "return=representation")
      .json(schedule)
      .send()
      .await
      .map_err(|e| eyre!("Failed to create maintenance schedule: {}", e))?;

    let response = check_status("maintenance_schedules", response).await?;
    let rows: Vec<ApiMaintenanceScheduleRow> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse created schedule: {}", e))?;

    rows
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Gateway returned no row for created schedule"))?
      .try_into()
  }
}

/// Turn a non-success response into a gateway error carrying the body text.
async fn check_status(table: &str, response: reqwest::Response) -> Result<reqwest::Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(eyre!(
    "Gateway responded {} for {}: {}",
    status,
    table,
    body.chars().take(200).collect::<String>()
  ))
}

/// Extract the total from a Content-Range value like "0-0/57" or "*/0".
fn parse_content_range_total(value: &str) -> Option<u64> {
  value.rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_content_range_with_range() {
    assert_eq!(parse_content_range_total("0-0/57"), Some(57));
  }

  #[test]
  fn test_content_range_empty_table() {
    assert_eq!(parse_content_range_total("*/0"), Some(0));
  }

  #[test]
  fn test_content_range_garbage() {
    assert_eq!(parse_content_range_total("pears"), None);
  }
}

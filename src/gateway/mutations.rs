//! Write operations and the cache invalidation they trigger.

use color_eyre::Result;
use tracing::error;

use crate::cache::{CacheLayer, MemoryStorage};
use crate::notify::Notifier;

use super::cache::{FAMILY_ALERTS, FAMILY_FOUNTAINS, FAMILY_SCHEDULES, FAMILY_STATS};
use super::cached_client::CachedGatewayClient;
use super::client::GatewayClient;
use super::types::{Alert, Fountain, FountainUpdate, MaintenanceSchedule, NewMaintenanceSchedule};

/// Performs writes against the gateway and keeps the read cache honest.
///
/// On success every affected cache family is dropped, so the next read
/// refetches instead of serving pre-write data, and a success toast is
/// emitted. On failure nothing is invalidated, a failure toast is emitted,
/// and the error is returned for the caller to react to. Writes are not
/// serialized against other clients; the gateway's last-write-wins semantics
/// apply.
#[derive(Clone)]
pub struct MutationDispatcher {
  gateway: GatewayClient,
  cache: CacheLayer<MemoryStorage>,
  notifier: Notifier,
}

impl MutationDispatcher {
  /// Build a dispatcher sharing the cached client's cache, so invalidations
  /// are visible to every reader.
  pub fn new(client: &CachedGatewayClient, notifier: Notifier) -> Self {
    Self {
      gateway: client.raw(),
      cache: client.cache(),
      notifier,
    }
  }

  /// Apply a partial update to a fountain.
  ///
  /// Invalidates the fountains family (the list and the single record) and
  /// the dashboard counts derived from fountain status.
  pub async fn update_fountain(&self, id: &str, update: FountainUpdate) -> Result<Fountain> {
    match self.gateway.update_fountain(id, &update).await {
      Ok(fountain) => {
        self.invalidate(&[FAMILY_FOUNTAINS, FAMILY_STATS]);
        self.notifier.success("Fountain updated");
        Ok(fountain)
      }
      Err(e) => {
        error!(fountain = id, error = %e, "fountain update failed");
        self.notifier.error("Failed to update fountain");
        Err(e)
      }
    }
  }

  /// Mark an alert resolved on behalf of `resolved_by`.
  pub async fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<Alert> {
    match self.gateway.resolve_alert(id, resolved_by).await {
      Ok(alert) => {
        self.invalidate(&[FAMILY_ALERTS, FAMILY_STATS]);
        self.notifier.success("Alert resolved");
        Ok(alert)
      }
      Err(e) => {
        error!(alert = id, error = %e, "alert resolution failed");
        self.notifier.error("Failed to resolve alert");
        Err(e)
      }
    }
  }

  /// Create a new maintenance schedule.
  pub async fn create_schedule(
    &self,
    schedule: NewMaintenanceSchedule,
  ) -> Result<MaintenanceSchedule> {
    match self.gateway.insert_schedule(&schedule).await {
      Ok(created) => {
        self.invalidate(&[FAMILY_SCHEDULES, FAMILY_STATS]);
        self.notifier.success("Maintenance scheduled");
        Ok(created)
      }
      Err(e) => {
        error!(fountain = %schedule.fountain_id, error = %e, "schedule creation failed");
        self.notifier.error("Failed to create maintenance schedule");
        Err(e)
      }
    }
  }

  fn invalidate(&self, families: &[&'static str]) {
    for family in families {
      if let Err(e) = self.cache.invalidate_family(family) {
        error!(family, error = %e, "cache invalidation failed");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::gateway::types::{FountainStatus, MaintenanceType, ScheduleStatus};
  use crate::notify::{Notification, NotifyKind};
  use axum::extract::State;
  use axum::http::StatusCode;
  use axum::response::{IntoResponse, Response};
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::{json, Value};
  use std::net::SocketAddr;
  use std::sync::{Arc, Mutex};
  use tokio::sync::mpsc;

  #[derive(Default)]
  struct StubState {
    fountain_status: String,
    fountain_hits: u32,
    alert_resolved: Option<(String, String)>,
    alert_hits: u32,
    schedule_hits: u32,
    fail_writes: bool,
  }

  type Stub = Arc<Mutex<StubState>>;

  fn fountain_row(status: &str) -> Value {
    json!({
      "id": "f1",
      "name": "Central Plaza",
      "location": "Main Square",
      "latitude": null,
      "longitude": null,
      "status": status,
      "installation_date": "2022-04-01",
      "last_maintenance_date": null,
      "next_maintenance_date": null,
      "water_flow_rate": 118.5,
      "pressure_rating": 85.2,
      "created_at": "2022-04-01T12:00:00Z",
      "updated_at": "2026-08-01T08:30:00Z"
    })
  }

  fn alert_row(resolved: &Option<(String, String)>) -> Value {
    json!({
      "id": "a1",
      "fountain_id": "f1",
      "alert_type": "leak",
      "severity": "high",
      "title": "Leak detected",
      "description": null,
      "is_resolved": resolved.is_some(),
      "resolved_at": resolved.as_ref().map(|(_, at)| at.clone()),
      "resolved_by": resolved.as_ref().map(|(by, _)| by.clone()),
      "created_at": "2026-08-01T08:30:00Z",
      "updated_at": "2026-08-01T08:30:00Z"
    })
  }

  async fn fountains_get(State(state): State<Stub>) -> Json<Value> {
    let mut s = state.lock().unwrap();
    s.fountain_hits += 1;
    Json(json!([fountain_row(&s.fountain_status)]))
  }

  async fn fountains_patch(State(state): State<Stub>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    if s.fail_writes {
      return (StatusCode::INTERNAL_SERVER_ERROR, "write refused").into_response();
    }
    if let Some(status) = body.get("status").and_then(Value::as_str) {
      s.fountain_status = status.to_string();
    }
    Json(json!([fountain_row(&s.fountain_status)])).into_response()
  }

  async fn alerts_get(State(state): State<Stub>) -> Json<Value> {
    let mut s = state.lock().unwrap();
    s.alert_hits += 1;
    Json(json!([alert_row(&s.alert_resolved)]))
  }

  async fn alerts_patch(State(state): State<Stub>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    if s.fail_writes {
      return (StatusCode::INTERNAL_SERVER_ERROR, "write refused").into_response();
    }
    let by = body["resolved_by"].as_str().unwrap_or_default().to_string();
    let at = body["resolved_at"].as_str().unwrap_or_default().to_string();
    s.alert_resolved = Some((by, at));
    Json(json!([alert_row(&s.alert_resolved)])).into_response()
  }

  async fn schedules_get(State(state): State<Stub>) -> Json<Value> {
    let mut s = state.lock().unwrap();
    s.schedule_hits += 1;
    Json(json!([]))
  }

  async fn schedules_post(Json(body): Json<Value>) -> Json<Value> {
    Json(json!([{
      "id": "s1",
      "fountain_id": body["fountain_id"],
      "maintenance_type": body["maintenance_type"],
      "scheduled_date": body["scheduled_date"],
      "completed_date": null,
      "status": body["status"],
      "description": body["description"],
      "technician_notes": null,
      "created_at": "2026-08-06T10:00:00Z",
      "updated_at": "2026-08-06T10:00:00Z"
    }]))
  }

  async fn spawn_stub() -> (SocketAddr, Stub) {
    let state: Stub = Arc::new(Mutex::new(StubState {
      fountain_status: "active".to_string(),
      ..StubState::default()
    }));

    let app = Router::new()
      .route("/rest/v1/fountains", get(fountains_get).patch(fountains_patch))
      .route("/rest/v1/alerts", get(alerts_get).patch(alerts_patch))
      .route(
        "/rest/v1/maintenance_schedules",
        get(schedules_get).post(schedules_post),
      )
      .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
  }

  async fn setup() -> (
    CachedGatewayClient,
    MutationDispatcher,
    Stub,
    mpsc::UnboundedReceiver<Notification>,
  ) {
    let (addr, state) = spawn_stub().await;
    let gateway =
      GatewayClient::from_parts(&format!("http://{}/", addr), "test-key").unwrap();
    let client = CachedGatewayClient::new(gateway);
    let (notifier, rx) = Notifier::channel();
    let dispatcher = MutationDispatcher::new(&client, notifier);
    (client, dispatcher, state, rx)
  }

  #[tokio::test]
  async fn test_fountain_update_invalidates_list_and_detail() {
    let (client, dispatcher, state, mut notices) = setup().await;

    let list = client.fountains().await.unwrap();
    assert_eq!(list.data[0].status, FountainStatus::Active);
    let cached = client.fountains().await.unwrap();
    assert_eq!(cached.source, CacheSource::CacheFresh);
    assert_eq!(state.lock().unwrap().fountain_hits, 1);

    let updated = dispatcher
      .update_fountain("f1", FountainUpdate::status(FountainStatus::Maintenance))
      .await
      .unwrap();
    assert_eq!(updated.status, FountainStatus::Maintenance);

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.kind, NotifyKind::Success);
    assert_eq!(notice.message, "Fountain updated");

    // Both the list and the single-record read must refetch.
    let list = client.fountains().await.unwrap();
    assert_eq!(list.source, CacheSource::Network);
    assert_eq!(list.data[0].status, FountainStatus::Maintenance);
    assert_eq!(state.lock().unwrap().fountain_hits, 2);

    let detail = client.fountain("f1").await.unwrap();
    assert_eq!(detail.data.unwrap().status, FountainStatus::Maintenance);
  }

  #[tokio::test]
  async fn test_resolve_alert_sets_fields_and_invalidates() {
    let (client, dispatcher, state, mut notices) = setup().await;

    let open = client.alerts(Some(false)).await.unwrap();
    assert!(!open.data[0].is_resolved);
    assert_eq!(state.lock().unwrap().alert_hits, 1);

    let alert = dispatcher.resolve_alert("a1", "operator").await.unwrap();
    assert!(alert.is_resolved);
    assert_eq!(alert.resolved_by.as_deref(), Some("operator"));
    assert!(alert.resolved_at.is_some());
    assert_eq!(notices.try_recv().unwrap().message, "Alert resolved");

    let refreshed = client.alerts(Some(false)).await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(state.lock().unwrap().alert_hits, 2);
  }

  #[tokio::test]
  async fn test_create_schedule_invalidates_schedules() {
    let (client, dispatcher, state, mut notices) = setup().await;

    client.schedules(None).await.unwrap();
    assert_eq!(state.lock().unwrap().schedule_hits, 1);

    let created = dispatcher
      .create_schedule(NewMaintenanceSchedule {
        fountain_id: "f1".to_string(),
        maintenance_type: MaintenanceType::Routine,
        scheduled_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 13).unwrap(),
        status: ScheduleStatus::Scheduled,
        description: Some("Routine check".to_string()),
        technician_notes: None,
      })
      .await
      .unwrap();
    assert_eq!(created.id, "s1");
    assert_eq!(created.maintenance_type, MaintenanceType::Routine);
    assert_eq!(notices.try_recv().unwrap().message, "Maintenance scheduled");

    client.schedules(None).await.unwrap();
    assert_eq!(state.lock().unwrap().schedule_hits, 2);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_cache_intact() {
    let (client, dispatcher, state, mut notices) = setup().await;

    client.fountains().await.unwrap();
    assert_eq!(state.lock().unwrap().fountain_hits, 1);

    state.lock().unwrap().fail_writes = true;
    let result = dispatcher
      .update_fountain("f1", FountainUpdate::status(FountainStatus::Inactive))
      .await;
    assert!(result.is_err());
    assert_eq!(notices.try_recv().unwrap().kind, NotifyKind::Error);

    // No invalidation happened: the list is still served from cache.
    let list = client.fountains().await.unwrap();
    assert_eq!(list.source, CacheSource::CacheFresh);
    assert_eq!(state.lock().unwrap().fountain_hits, 1);
  }
}

//! The AI stub service: two HTTP endpoints returning randomized placeholder
//! output behind fixed request/response contracts.
//!
//! There is no model behind these handlers. They validate the request shape,
//! wait a fixed "inference" delay, and return plausible random numbers. Only
//! the contract matters to callers.

use axum::extract::{Request, State};
use axum::http::header::{
  HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
  ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use color_eyre::{eyre::eyre, Result};
use rand::Rng;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use super::types::{
  AnalysisResponse, MaintenanceAnalysis, PredictionResponse, Predictions, Priority,
  RecommendedAction, RiskLevel,
};

pub const PREDICTIONS_PATH: &str = "/api/ai-predictions";
pub const ANALYSIS_PATH: &str = "/api/maintenance-ai";

/// Simulated inference latency per endpoint.
const PREDICTION_DELAY: Duration = Duration::from_millis(1000);
const ANALYSIS_DELAY: Duration = Duration::from_millis(1500);

/// Origins allowed by default when none are configured.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Clone)]
pub struct AiServiceConfig {
  pub allowed_origins: Vec<String>,
}

impl Default for AiServiceConfig {
  fn default() -> Self {
    Self {
      allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
    }
  }
}

/// Build the stub service router.
pub fn router(config: AiServiceConfig) -> Router {
  Router::new()
    .route(PREDICTIONS_PATH, post(predictions).options(preflight))
    .route(ANALYSIS_PATH, post(analysis).options(preflight))
    .layer(middleware::from_fn_with_state(config, cors))
}

/// Run the stub service until the process is stopped.
pub async fn serve(listen: SocketAddr, config: AiServiceConfig) -> Result<()> {
  let app = router(config);

  let listener = tokio::net::TcpListener::bind(listen)
    .await
    .map_err(|e| eyre!("Failed to bind AI stub service on {}: {}", listen, e))?;
  info!("AI stub service listening on {}", listen);

  axum::serve(listener, app)
    .await
    .map_err(|e| eyre!("AI stub service failed: {}", e))
}

/// Reflect the request origin back only when it is on the allow-list
/// (exact match); method/header allowances are always advertised.
async fn cors(State(config): State<AiServiceConfig>, request: Request, next: Next) -> Response {
  let origin = request
    .headers()
    .get(ORIGIN)
    .and_then(|v| v.to_str().ok())
    .map(String::from);

  let mut response = next.run(request).await;
  let headers = response.headers_mut();

  if let Some(origin) = origin {
    if config.allowed_origins.iter().any(|o| o == &origin) {
      if let Ok(value) = HeaderValue::from_str(&origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
      }
    }
  }
  headers.insert(
    ACCESS_CONTROL_ALLOW_METHODS,
    HeaderValue::from_static("GET, POST, OPTIONS"),
  );
  headers.insert(
    ACCESS_CONTROL_ALLOW_HEADERS,
    HeaderValue::from_static("Content-Type"),
  );

  response
}

async fn preflight() -> StatusCode {
  StatusCode::OK
}

fn bad_request(message: &str) -> Response {
  (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn predictions(Json(body): Json<Value>) -> Response {
  // An empty id is as invalid as a missing one.
  let fountain_id = match body.get("fountainId").and_then(Value::as_str) {
    Some(id) if !id.is_empty() => id.to_string(),
    _ => return bad_request("Invalid fountainId"),
  };
  if !body.get("sensorData").map(Value::is_array).unwrap_or(false) {
    return bad_request("Invalid sensorData");
  }

  tokio::time::sleep(PREDICTION_DELAY).await;

  let predictions = {
    let mut rng = rand::thread_rng();
    let risk_roll: f64 = rng.gen();
    Predictions {
      maintenance_needed: rng.gen_bool(0.3),
      next_maintenance_date: (Utc::now() + ChronoDuration::days(7)).to_rfc3339(),
      efficiency_score: rng.gen_range(60..100),
      recommendations: vec![
        "Check water pressure sensors".to_string(),
        "Clean filter system".to_string(),
        "Monitor flow rate patterns".to_string(),
      ],
      risk_level: if risk_roll > 0.8 {
        RiskLevel::High
      } else if risk_roll > 0.5 {
        RiskLevel::Medium
      } else {
        RiskLevel::Low
      },
    }
  };

  Json(PredictionResponse {
    success: true,
    predictions,
    timestamp: Utc::now().to_rfc3339(),
    fountain_id,
  })
  .into_response()
}

async fn analysis(Json(body): Json<Value>) -> Response {
  if !body.get("fountainData").map(Value::is_object).unwrap_or(false) {
    return bad_request("Invalid fountainData");
  }
  if !body.get("sensorHistory").map(Value::is_array).unwrap_or(false) {
    return bad_request("Invalid sensorHistory");
  }
  if !body
    .get("maintenanceHistory")
    .map(Value::is_array)
    .unwrap_or(false)
  {
    return bad_request("Invalid maintenanceHistory");
  }

  tokio::time::sleep(ANALYSIS_DELAY).await;

  let (analysis, confidence) = {
    let mut rng = rand::thread_rng();
    let priority_roll: f64 = rng.gen();
    let analysis = MaintenanceAnalysis {
      priority: if priority_roll > 0.8 {
        Priority::Urgent
      } else if priority_roll > 0.5 {
        Priority::High
      } else {
        Priority::Normal
      },
      estimated_cost: rng.gen_range(100..600),
      time_to_failure: rng.gen_range(1..31),
      recommended_actions: recommended_actions(),
      efficiency_improvement: rng.gen_range(5..25),
      next_inspection_date: (Utc::now() + ChronoDuration::days(14)).to_rfc3339(),
    };
    (analysis, rng.gen_range(70..100))
  };

  Json(AnalysisResponse {
    success: true,
    analysis,
    timestamp: Utc::now().to_rfc3339(),
    confidence,
  })
  .into_response()
}

fn recommended_actions() -> Vec<RecommendedAction> {
  vec![
    RecommendedAction {
      action: "Replace water filter".to_string(),
      urgency: "high".to_string(),
      estimated_time: "2 hours".to_string(),
      cost: "$50-100".to_string(),
    },
    RecommendedAction {
      action: "Calibrate pressure sensors".to_string(),
      urgency: "medium".to_string(),
      estimated_time: "1 hour".to_string(),
      cost: "$25-50".to_string(),
    },
    RecommendedAction {
      action: "Inspect pump system".to_string(),
      urgency: "low".to_string(),
      estimated_time: "30 minutes".to_string(),
      cost: "$0-25".to_string(),
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::to_bytes;

  async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test(start_paused = true)]
  async fn test_predictions_rejects_empty_fountain_id() {
    let response = predictions(Json(json!({ "fountainId": "", "sensorData": [] }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid fountainId");
  }

  #[tokio::test(start_paused = true)]
  async fn test_predictions_rejects_non_array_sensor_data() {
    let response =
      predictions(Json(json!({ "fountainId": "f1", "sensorData": "not-an-array" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid sensorData");
  }

  #[tokio::test(start_paused = true)]
  async fn test_predictions_contract() {
    let response = predictions(Json(json!({
      "fountainId": "f1",
      "sensorData": [{ "flow_rate": 120.0 }]
    })))
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["fountainId"], "f1");

    let score = body["predictions"]["efficiencyScore"].as_u64().unwrap();
    assert!((60..=100).contains(&score));
    assert_eq!(
      body["predictions"]["recommendations"].as_array().unwrap().len(),
      3
    );
    let risk = body["predictions"]["riskLevel"].as_str().unwrap();
    assert!(matches!(risk, "low" | "medium" | "high"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_analysis_rejects_missing_maintenance_history() {
    let response = analysis(Json(json!({
      "fountainData": { "id": "f1" },
      "sensorHistory": []
    })))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid maintenanceHistory");
  }

  #[tokio::test(start_paused = true)]
  async fn test_analysis_contract() {
    let response = analysis(Json(json!({
      "fountainData": { "id": "f1" },
      "sensorHistory": [],
      "maintenanceHistory": []
    })))
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let confidence = body["confidence"].as_u64().unwrap();
    assert!((70..=99).contains(&confidence));

    let analysis = &body["analysis"];
    let cost = analysis["estimatedCost"].as_u64().unwrap();
    assert!((100..=599).contains(&cost));
    let ttf = analysis["timeToFailure"].as_u64().unwrap();
    assert!((1..=30).contains(&ttf));
    assert_eq!(analysis["recommendedActions"].as_array().unwrap().len(), 3);
    assert!(analysis["recommendedActions"][0]["estimatedTime"].is_string());
  }

  // Full-stack checks over a bound socket: method handling, CORS, and the
  // artificial delay.
  #[tokio::test]
  async fn test_service_over_http() {
    let app = router(AiServiceConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    // Preflight: 200, origin echoed only when allow-listed.
    let preflight = client
      .request(reqwest::Method::OPTIONS, format!("{}{}", base, PREDICTIONS_PATH))
      .header("Origin", "http://localhost:5173")
      .send()
      .await
      .unwrap();
    assert_eq!(preflight.status(), 200);
    assert_eq!(
      preflight
        .headers()
        .get("access-control-allow-origin")
        .unwrap(),
      "http://localhost:5173"
    );

    let denied = client
      .request(reqwest::Method::OPTIONS, format!("{}{}", base, PREDICTIONS_PATH))
      .header("Origin", "http://evil.example")
      .send()
      .await
      .unwrap();
    assert!(denied.headers().get("access-control-allow-origin").is_none());

    // Non-POST, non-OPTIONS methods are rejected.
    let get = client
      .get(format!("{}{}", base, ANALYSIS_PATH))
      .send()
      .await
      .unwrap();
    assert_eq!(get.status(), 405);

    // A valid request takes at least the fixed processing delay.
    let started = std::time::Instant::now();
    let ok = client
      .post(format!("{}{}", base, PREDICTIONS_PATH))
      .json(&json!({ "fountainId": "f1", "sensorData": [] }))
      .send()
      .await
      .unwrap();
    assert_eq!(ok.status(), 200);
    assert!(started.elapsed() >= Duration::from_millis(1000));
  }
}

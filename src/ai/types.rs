//! Request/response schemas for the AI endpoints.
//!
//! Field names follow the endpoints' JSON contract (camelCase on the wire).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

/// Payload of a successful predictions call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
  pub maintenance_needed: bool,
  pub next_maintenance_date: String,
  pub efficiency_score: u32,
  pub recommendations: Vec<String>,
  pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
  pub success: bool,
  pub predictions: Predictions,
  pub timestamp: String,
  pub fountain_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Urgent,
  High,
  Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedAction {
  pub action: String,
  pub urgency: String,
  pub estimated_time: String,
  pub cost: String,
}

/// Payload of a successful maintenance-analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceAnalysis {
  pub priority: Priority,
  pub estimated_cost: u32,
  pub time_to_failure: u32,
  pub recommended_actions: Vec<RecommendedAction>,
  pub efficiency_improvement: u32,
  pub next_inspection_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
  pub success: bool,
  pub analysis: MaintenanceAnalysis,
  pub timestamp: String,
  pub confidence: u32,
}

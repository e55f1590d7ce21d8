use color_eyre::{eyre::eyre, Result};
use serde_json::json;

use crate::config::Config;
use crate::gateway::types::{Fountain, MaintenanceSchedule, SensorReading};

use super::types::{AnalysisResponse, MaintenanceAnalysis, PredictionResponse, Predictions};

/// Client for the AI stub endpoints.
///
/// The endpoints are a mocked remote service: this client only cares that the
/// request/response contract holds, never about what the numbers mean.
#[derive(Clone)]
pub struct AiClient {
  http: reqwest::Client,
  predictions_url: String,
  analysis_url: String,
}

impl AiClient {
  pub fn new(config: &Config) -> Self {
    Self {
      http: reqwest::Client::new(),
      predictions_url: config.ai.predictions_url.clone(),
      analysis_url: config.ai.analysis_url.clone(),
    }
  }

  /// Request maintenance/efficiency predictions for one fountain.
  pub async fn predictions(
    &self,
    fountain_id: &str,
    sensor_data: &[SensorReading],
  ) -> Result<Predictions> {
    let body = json!({
      "fountainId": fountain_id,
      "sensorData": sensor_data,
    });

    let response = self
      .http
      .post(&self.predictions_url)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach AI predictions endpoint: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!(
        "AI predictions endpoint responded {}",
        response.status()
      ));
    }

    let parsed: PredictionResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse AI predictions response: {}", e))?;
    Ok(parsed.predictions)
  }

  /// Request a maintenance analysis for one fountain.
  pub async fn maintenance_analysis(
    &self,
    fountain: &Fountain,
    sensor_history: &[SensorReading],
    maintenance_history: &[MaintenanceSchedule],
  ) -> Result<MaintenanceAnalysis> {
    let body = json!({
      "fountainData": fountain,
      "sensorHistory": sensor_history,
      "maintenanceHistory": maintenance_history,
    });

    let response = self
      .http
      .post(&self.analysis_url)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach AI analysis endpoint: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!("AI analysis endpoint responded {}", response.status()));
    }

    let parsed: AnalysisResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse AI analysis response: {}", e))?;
    Ok(parsed.analysis)
  }
}

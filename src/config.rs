use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub gateway: GatewayConfig,
  #[serde(default)]
  pub ai: AiConfig,
  /// Custom title for the header (defaults to the gateway domain if not set)
  pub title: Option<String>,
  /// View to open at startup: overview, fountains, alerts or schedules
  pub default_view: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  /// Base URL of the hosted data gateway
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
  #[serde(default = "default_predictions_url")]
  pub predictions_url: String,
  #[serde(default = "default_analysis_url")]
  pub analysis_url: String,
  /// Address the `serve-ai` subcommand binds to
  #[serde(default = "default_ai_listen")]
  pub listen: String,
  /// Exact-match CORS allow-list for the served stub endpoints
  #[serde(default = "default_allowed_origins")]
  pub allowed_origins: Vec<String>,
}

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      predictions_url: default_predictions_url(),
      analysis_url: default_analysis_url(),
      listen: default_ai_listen(),
      allowed_origins: default_allowed_origins(),
    }
  }
}

fn default_predictions_url() -> String {
  "http://127.0.0.1:8787/api/ai-predictions".to_string()
}

fn default_analysis_url() -> String {
  "http://127.0.0.1:8787/api/maintenance-ai".to_string()
}

fn default_ai_listen() -> String {
  "127.0.0.1:8787".to_string()
}

fn default_allowed_origins() -> Vec<String> {
  crate::ai::service::DEFAULT_ALLOWED_ORIGINS
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./aquamon.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/aquamon/config.yaml
  /// 4. ~/.config/aquamon/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/aquamon/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("aquamon.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("aquamon").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the gateway API key from environment variables.
  ///
  /// Checks AQUAMON_GATEWAY_KEY first, then GATEWAY_API_KEY as fallback.
  pub fn get_gateway_key() -> Result<String> {
    std::env::var("AQUAMON_GATEWAY_KEY")
      .or_else(|_| std::env::var("GATEWAY_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Gateway API key not found. Set AQUAMON_GATEWAY_KEY or GATEWAY_API_KEY environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_fills_ai_defaults() {
    let config: Config = serde_yaml::from_str(
      "gateway:\n  url: https://data.example.com\n",
    )
    .unwrap();

    assert_eq!(config.gateway.url, "https://data.example.com");
    assert_eq!(config.ai.listen, "127.0.0.1:8787");
    assert_eq!(config.ai.allowed_origins.len(), 2);
    assert!(config.default_view.is_none());
  }
}

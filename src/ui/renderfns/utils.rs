use ratatui::prelude::Color;

use crate::gateway::types::{FountainStatus, ScheduleStatus, Severity};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.len() <= max_len {
    s.to_string()
  } else {
    format!("{}...", &s[..max_len.saturating_sub(3)])
  }
}

/// Get the display color for a fountain status
pub fn status_color(status: FountainStatus) -> Color {
  match status {
    FountainStatus::Active => Color::Green,
    FountainStatus::Maintenance => Color::Yellow,
    FountainStatus::Inactive => Color::DarkGray,
    FountainStatus::Error => Color::Red,
  }
}

/// Get the display color for an alert severity
pub fn severity_color(severity: Severity) -> Color {
  match severity {
    Severity::Low => Color::White,
    Severity::Medium => Color::Yellow,
    Severity::High => Color::LightRed,
    Severity::Critical => Color::Red,
  }
}

/// Get the display color for a schedule status
pub fn schedule_color(status: ScheduleStatus) -> Color {
  match status {
    ScheduleStatus::Scheduled => Color::White,
    ScheduleStatus::InProgress => Color::Yellow,
    ScheduleStatus::Completed => Color::Green,
    ScheduleStatus::Cancelled => Color::DarkGray,
  }
}

/// Format an optional sensor value with its unit, "-" when absent.
pub fn metric(value: Option<f64>, unit: &str) -> String {
  match value {
    Some(v) => format!("{:.1} {}", v, unit),
    None => "-".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_status_colors() {
    assert_eq!(status_color(FountainStatus::Active), Color::Green);
    assert_eq!(status_color(FountainStatus::Error), Color::Red);
  }

  #[test]
  fn test_metric_formatting() {
    assert_eq!(metric(Some(118.53), "L/min"), "118.5 L/min");
    assert_eq!(metric(None, "psi"), "-");
  }
}

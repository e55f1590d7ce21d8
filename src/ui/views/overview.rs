use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::time::Duration;

use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::types::{Alert, DashboardStats, Severity};
use crate::query::Query;
use crate::ui::renderfns::{severity_color, truncate};
use crate::ui::view::{View, ViewAction};

/// Fleet overview: headline counts plus the most recent open alerts.
pub struct OverviewView {
  stats: Query<DashboardStats>,
  alerts: Query<Vec<Alert>>,
}

impl OverviewView {
  pub fn new(gateway: CachedGatewayClient) -> Self {
    let stats_gateway = gateway.clone();
    let mut stats = Query::new(move || {
      let gateway = stats_gateway.clone();
      async move {
        gateway
          .dashboard_stats()
          .await
          .map(|r| r.data)
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(Duration::from_secs(30));

    let mut alerts = Query::new(move || {
      let gateway = gateway.clone();
      async move {
        gateway
          .alerts(Some(false))
          .await
          .map(|r| r.data)
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(Duration::from_secs(15));

    stats.fetch();
    alerts.fetch();

    Self { stats, alerts }
  }

  fn render_tiles(&self, frame: &mut Frame, area: Rect) {
    let tiles = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Percentage(25),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
        Constraint::Percentage(25),
      ])
      .split(area);

    let critical = self
      .alerts
      .data()
      .map(|alerts| {
        alerts
          .iter()
          .filter(|a| a.severity == Severity::Critical)
          .count()
      })
      .unwrap_or(0);

    let stats = self.stats.data().copied().unwrap_or_default();
    let loading = self.stats.is_loading();

    let tile_data: [(&str, String, String, Color); 4] = [
      (
        "Fountains",
        stats.total_fountains.to_string(),
        format!("{} active", stats.active_fountains),
        Color::Cyan,
      ),
      (
        "Open alerts",
        stats.unresolved_alerts.to_string(),
        format!("{} critical", critical),
        if stats.unresolved_alerts > 0 {
          Color::Red
        } else {
          Color::Green
        },
      ),
      (
        "Upcoming maintenance",
        stats.upcoming_maintenance.to_string(),
        "scheduled".to_string(),
        Color::Yellow,
      ),
      (
        "Gateway",
        if self.stats.error().is_some() {
          "degraded".to_string()
        } else {
          "ok".to_string()
        },
        if self.stats.error().is_some() {
          "stale data shown".to_string()
        } else {
          "live".to_string()
        },
        if self.stats.error().is_some() {
          Color::Red
        } else {
          Color::Green
        },
      ),
    ];

    for (i, (label, value, detail, color)) in tile_data.iter().enumerate() {
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
      let inner = block.inner(tiles[i]);
      frame.render_widget(block, tiles[i]);

      let value_text = if loading { "...".to_string() } else { value.clone() };
      let lines = vec![
        Line::from(Span::styled(*label, Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
          value_text,
          Style::default().fg(*color).bold(),
        )),
        Line::from(Span::styled(
          detail.clone(),
          Style::default().fg(Color::DarkGray),
        )),
      ];
      frame.render_widget(Paragraph::new(lines), inner);
    }
  }

  fn render_alerts(&self, frame: &mut Frame, area: Rect) {
    let title = if self.alerts.is_loading() {
      " Open alerts (loading...) ".to_string()
    } else if let Some(e) = self.alerts.error() {
      format!(" Open alerts (error: {}) ", truncate(e, 40))
    } else {
      " Open alerts ".to_string()
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = match self.alerts.data() {
      Some(alerts) if alerts.is_empty() => vec![Line::from(Span::styled(
        "All clear.",
        Style::default().fg(Color::Green),
      ))],
      Some(alerts) => alerts
        .iter()
        .take(inner.height as usize)
        .map(|alert| {
          Line::from(vec![
            Span::styled(
              format!("{:<10}", alert.severity),
              Style::default().fg(severity_color(alert.severity)).bold(),
            ),
            Span::raw(truncate(&alert.title, 60)),
            Span::styled(
              format!("  {}", alert.created_at.format("%m-%d %H:%M")),
              Style::default().fg(Color::DarkGray),
            ),
          ])
        })
        .collect(),
      None => vec![Line::from(Span::styled(
        "Loading...",
        Style::default().fg(Color::DarkGray),
      ))],
    };

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

impl View for OverviewView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.stats.refetch();
        self.alerts.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(3)])
      .split(area);

    self.render_tiles(frame, rows[0]);
    self.render_alerts(frame, rows[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Overview".to_string()
  }

  fn tick(&mut self) {
    self.stats.poll();
    self.alerts.poll();
    self.stats.refresh_if_stale();
    self.alerts.refresh_if_stale();
  }
}

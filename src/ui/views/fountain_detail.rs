use chrono::{Duration as ChronoDuration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::ai::client::AiClient;
use crate::ai::types::{MaintenanceAnalysis, Predictions};
use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::mutations::MutationDispatcher;
use crate::gateway::realtime::ReadingStream;
use crate::gateway::types::{
  Fountain, FountainStatus, FountainUpdate, MaintenanceSchedule, MaintenanceType,
  NewMaintenanceSchedule, ScheduleStatus, SensorReading,
};
use crate::query::Query;
use crate::ui::renderfns::{metric, status_color, truncate};
use crate::ui::view::{View, ViewAction};

const READINGS_LOOKBACK_HOURS: u32 = 24;

/// Detail view for one fountain: record, live sensors, schedules, AI
/// insights, and the status/schedule mutations.
pub struct FountainDetailView {
  id: String,
  name: String,
  dispatcher: MutationDispatcher,
  ai: AiClient,

  fountain: Query<Option<Fountain>>,
  latest: Query<Option<SensorReading>>,
  readings: Query<Vec<SensorReading>>,
  schedules: Query<Vec<MaintenanceSchedule>>,

  // AI queries are built on demand with a snapshot of the loaded data.
  predictions: Option<Query<Predictions>>,
  analysis: Option<Query<MaintenanceAnalysis>>,

  /// Per-fountain insert feed; torn down when this view is dropped.
  live: ReadingStream,
  live_count: u32,

  pending_mutation: Option<oneshot::Receiver<bool>>,
}

impl FountainDetailView {
  pub fn new(
    id: String,
    name: String,
    gateway: CachedGatewayClient,
    dispatcher: MutationDispatcher,
    ai: AiClient,
  ) -> Self {
    let fountain = {
      let gateway = gateway.clone();
      let id = id.clone();
      Query::new(move || {
        let gateway = gateway.clone();
        let id = id.clone();
        async move {
          gateway
            .fountain(&id)
            .await
            .map(|r| r.data)
            .map_err(|e| e.to_string())
        }
      })
    };

    let latest = {
      let gateway = gateway.clone();
      let id = id.clone();
      Query::new(move || {
        let gateway = gateway.clone();
        let id = id.clone();
        async move {
          gateway
            .latest_reading(&id)
            .await
            .map(|r| r.data)
            .map_err(|e| e.to_string())
        }
      })
      .with_stale_time(Duration::from_secs(5))
    };

    let readings = {
      let gateway = gateway.clone();
      let id = id.clone();
      Query::new(move || {
        let gateway = gateway.clone();
        let id = id.clone();
        async move {
          gateway
            .readings(Some(&id), READINGS_LOOKBACK_HOURS)
            .await
            .map(|r| r.data)
            .map_err(|e| e.to_string())
        }
      })
      .with_stale_time(Duration::from_secs(10))
    };

    let schedules = {
      let gateway = gateway.clone();
      let id = id.clone();
      Query::new(move || {
        let gateway = gateway.clone();
        let id = id.clone();
        async move {
          gateway
            .schedules(Some(&id))
            .await
            .map(|r| r.data)
            .map_err(|e| e.to_string())
        }
      })
      .with_stale_time(Duration::from_secs(60))
    };

    let live = gateway.subscribe_readings(&id);

    let mut view = Self {
      id,
      name,
      dispatcher,
      ai,
      fountain,
      latest,
      readings,
      schedules,
      predictions: None,
      analysis: None,
      live,
      live_count: 0,
      pending_mutation: None,
    };
    view.fountain.fetch();
    view.latest.fetch();
    view.readings.fetch();
    view.schedules.fetch();
    view
  }

  fn refetch_all(&mut self) {
    self.fountain.refetch();
    self.latest.refetch();
    self.readings.refetch();
    self.schedules.refetch();
  }

  /// Request predictions for the currently loaded sensor data.
  fn request_predictions(&mut self) {
    let ai = self.ai.clone();
    let id = self.id.clone();
    let sensor_data: Vec<SensorReading> = self.readings.data().cloned().unwrap_or_default();

    let mut query = Query::new(move || {
      let ai = ai.clone();
      let id = id.clone();
      let sensor_data = sensor_data.clone();
      async move {
        ai.predictions(&id, &sensor_data)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.predictions = Some(query);
  }

  /// Request a maintenance analysis for the loaded fountain and history.
  fn request_analysis(&mut self) {
    let Some(Some(fountain)) = self.fountain.data().cloned() else {
      return;
    };
    let ai = self.ai.clone();
    let sensor_history: Vec<SensorReading> = self.readings.data().cloned().unwrap_or_default();
    let maintenance_history: Vec<MaintenanceSchedule> =
      self.schedules.data().cloned().unwrap_or_default();

    let mut query = Query::new(move || {
      let ai = ai.clone();
      let fountain = fountain.clone();
      let sensor_history = sensor_history.clone();
      let maintenance_history = maintenance_history.clone();
      async move {
        ai.maintenance_analysis(&fountain, &sensor_history, &maintenance_history)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.analysis = Some(query);
  }

  /// Flip the fountain between maintenance and active status.
  fn toggle_maintenance(&mut self) {
    if self.pending_mutation.is_some() {
      return;
    }
    let Some(Some(fountain)) = self.fountain.data() else {
      return;
    };

    let next = match fountain.status {
      FountainStatus::Maintenance => FountainStatus::Active,
      _ => FountainStatus::Maintenance,
    };

    let dispatcher = self.dispatcher.clone();
    let id = self.id.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let ok = dispatcher
        .update_fountain(&id, FountainUpdate::status(next))
        .await
        .is_ok();
      let _ = tx.send(ok);
    });
    self.pending_mutation = Some(rx);
  }

  /// Schedule a routine visit a week out.
  fn schedule_routine_maintenance(&mut self) {
    if self.pending_mutation.is_some() {
      return;
    }

    let schedule = NewMaintenanceSchedule {
      fountain_id: self.id.clone(),
      maintenance_type: MaintenanceType::Routine,
      scheduled_date: (Utc::now() + ChronoDuration::days(7)).date_naive(),
      status: ScheduleStatus::Scheduled,
      description: Some("Routine check".to_string()),
      technician_notes: None,
    };

    let dispatcher = self.dispatcher.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let ok = dispatcher.create_schedule(schedule).await.is_ok();
      let _ = tx.send(ok);
    });
    self.pending_mutation = Some(rx);
  }

  fn render_info(&self, frame: &mut Frame, area: Rect) {
    let title = if self.fountain.is_loading() {
      format!(" {} (loading...) ", self.name)
    } else if let Some(e) = self.fountain.error() {
      format!(" {} (error: {}) ", self.name, truncate(e, 30))
    } else {
      format!(" {} ", self.name)
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(record) = self.fountain.data() else {
      return;
    };

    // Loaded, but no such row: an explicit state, not an error.
    let Some(fountain) = record else {
      let paragraph = Paragraph::new("Fountain not found.")
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let next_visit = self
      .schedules
      .data()
      .and_then(|schedules| {
        schedules
          .iter()
          .find(|s| s.status == ScheduleStatus::Scheduled)
      })
      .map(|s| format!("{} ({})", s.scheduled_date, s.maintenance_type))
      .unwrap_or_else(|| "-".to_string());

    let lines = vec![
      Line::from(vec![
        Span::styled("Status:      ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          fountain.status.to_string(),
          Style::default().fg(status_color(fountain.status)).bold(),
        ),
      ]),
      Line::from(vec![
        Span::styled("Location:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(fountain.location.clone()),
      ]),
      Line::from(vec![
        Span::styled("Installed:   ", Style::default().fg(Color::DarkGray)),
        Span::raw(fountain.installation_date.to_string()),
      ]),
      Line::from(vec![
        Span::styled("Flow rating: ", Style::default().fg(Color::DarkGray)),
        Span::raw(metric(fountain.water_flow_rate, "L/min")),
      ]),
      Line::from(vec![
        Span::styled("Pressure:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(metric(fountain.pressure_rating, "psi")),
      ]),
      Line::from(vec![
        Span::styled("Next visit:  ", Style::default().fg(Color::DarkGray)),
        Span::raw(next_visit),
      ]),
    ];

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
  }

  fn render_latest(&self, frame: &mut Frame, area: Rect) {
    let title = if self.live_count > 0 {
      format!(" Sensors (live, {} updates) ", self.live_count)
    } else {
      " Sensors ".to_string()
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content = match self.latest.data() {
      Some(Some(reading)) => vec![
        Line::from(format!("Flow:        {}", metric(reading.flow_rate, "L/min"))),
        Line::from(format!("Pressure:    {}", metric(reading.pressure, "psi"))),
        Line::from(format!("Temperature: {}", metric(reading.temperature, "C"))),
        Line::from(format!("pH:          {}", metric(reading.ph_level, ""))),
        Line::from(format!("Battery:     {}", metric(reading.battery_level, "%"))),
        Line::from(vec![Span::styled(
          format!("recorded {}", reading.recorded_at.format("%H:%M:%S")),
          Style::default().fg(Color::DarkGray),
        )]),
      ],
      Some(None) => vec![Line::from(Span::styled(
        "No readings reported yet.",
        Style::default().fg(Color::DarkGray),
      ))],
      None => vec![Line::from(Span::styled(
        if self.latest.error().is_some() {
          "Failed to load sensors."
        } else {
          "Loading..."
        },
        Style::default().fg(Color::DarkGray),
      ))],
    };

    frame.render_widget(Paragraph::new(content), inner);
  }

  fn render_readings(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.readings.is_loading() {
      " Readings 24h (loading...) ".to_string()
    } else if let Some(e) = self.readings.error() {
      format!(" Readings 24h (error: {}) ", truncate(e, 30))
    } else {
      format!(
        " Readings 24h ({}) ",
        self.readings.data().map(Vec::len).unwrap_or(0)
      )
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let items: Vec<ListItem> = self
      .readings
      .data()
      .map(|readings| {
        readings
          .iter()
          .map(|r| {
            ListItem::new(Line::from(vec![
              Span::styled(
                format!("{}  ", r.recorded_at.format("%m-%d %H:%M")),
                Style::default().fg(Color::DarkGray),
              ),
              Span::raw(format!(
                "flow {:<14} pressure {:<12} quality {}",
                metric(r.flow_rate, "L/min"),
                metric(r.pressure, "psi"),
                metric(r.water_quality_score, ""),
              )),
            ]))
          })
          .collect()
      })
      .unwrap_or_default();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn render_insights(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" AI insights ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    match &self.predictions {
      None => lines.push(Line::from(Span::styled(
        "<p> request predictions",
        Style::default().fg(Color::DarkGray),
      ))),
      Some(query) => match (query.data(), query.error()) {
        (Some(p), _) => {
          lines.push(Line::from(vec![
            Span::styled("Predictions: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
              "efficiency {}%, risk {:?}, maintenance needed: {}",
              p.efficiency_score,
              p.risk_level,
              if p.maintenance_needed { "yes" } else { "no" },
            )),
          ]));
          for rec in &p.recommendations {
            lines.push(Line::from(format!("  - {}", rec)));
          }
        }
        (None, Some(e)) => lines.push(Line::from(Span::styled(
          format!("Predictions failed: {}", truncate(e, 60)),
          Style::default().fg(Color::Red),
        ))),
        (None, None) => lines.push(Line::from("Predictions: requesting...")),
      },
    }

    match &self.analysis {
      None => lines.push(Line::from(Span::styled(
        "<a> request maintenance analysis",
        Style::default().fg(Color::DarkGray),
      ))),
      Some(query) => match (query.data(), query.error()) {
        (Some(a), _) => {
          lines.push(Line::from(vec![
            Span::styled("Analysis:    ", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
              "priority {:?}, est. ${}, {} days to failure, next inspection {}",
              a.priority,
              a.estimated_cost,
              a.time_to_failure,
              truncate(&a.next_inspection_date, 10),
            )),
          ]));
          for action in &a.recommended_actions {
            lines.push(Line::from(format!(
              "  - {} ({}, {}, {})",
              action.action, action.urgency, action.estimated_time, action.cost
            )));
          }
        }
        (None, Some(e)) => lines.push(Line::from(Span::styled(
          format!("Analysis failed: {}", truncate(e, 60)),
          Style::default().fg(Color::Red),
        ))),
        (None, None) => lines.push(Line::from("Analysis: requesting...")),
      },
    }

    lines.push(Line::from(Span::styled(
      "<m> toggle maintenance   <n> schedule visit   <r> refresh",
      Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
  }
}

impl View for FountainDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.refetch_all(),
      KeyCode::Char('p') => self.request_predictions(),
      KeyCode::Char('a') => self.request_analysis(),
      KeyCode::Char('m') => self.toggle_maintenance(),
      KeyCode::Char('n') => self.schedule_routine_maintenance(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(8),
        Constraint::Min(4),
        Constraint::Length(10),
      ])
      .split(area);

    let top = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(rows[0]);

    self.render_info(frame, top[0]);
    self.render_latest(frame, top[1]);
    self.render_readings(frame, rows[1]);
    self.render_insights(frame, rows[2]);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn tick(&mut self) {
    self.fountain.poll();
    self.latest.poll();
    self.readings.poll();
    self.schedules.poll();
    if let Some(query) = &mut self.predictions {
      query.poll();
    }
    if let Some(query) = &mut self.analysis {
      query.poll();
    }

    self.latest.refresh_if_stale();
    self.readings.refresh_if_stale();
    self.schedules.refresh_if_stale();

    // Apply pushed inserts from the live feed; the push already carries the
    // row, so no refetch is needed.
    while let Some(reading) = self.live.try_next() {
      self.live_count += 1;
      self.latest.prime(Some(reading.clone()));
      self.readings.mutate(|readings| readings.insert(0, reading));
    }

    // A finished mutation means our cached reads are invalidated; pick the
    // fresh rows up immediately.
    if let Some(rx) = &mut self.pending_mutation {
      match rx.try_recv() {
        Ok(success) => {
          self.pending_mutation = None;
          if success {
            self.fountain.refetch();
            self.schedules.refetch();
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {}
        Err(oneshot::error::TryRecvError::Closed) => {
          self.pending_mutation = None;
        }
      }
    }
  }
}

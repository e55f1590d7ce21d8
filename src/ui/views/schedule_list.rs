use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;

use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::types::MaintenanceSchedule;
use crate::query::Query;
use crate::ui::components::{KeyResult, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{schedule_color, truncate};
use crate::ui::view::{View, ViewAction};

/// View for the maintenance calendar across all fountains
pub struct ScheduleListView {
  query: Query<Vec<MaintenanceSchedule>>,
  list_state: ListState,
  search: SearchInput,
}

impl ScheduleListView {
  pub fn new(gateway: CachedGatewayClient) -> Self {
    let mut query = Query::new(move || {
      let gateway = gateway.clone();
      async move {
        gateway
          .schedules(None)
          .await
          .map(|r| r.data)
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(Duration::from_secs(60));
    query.fetch();

    Self {
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  /// Schedules matching the current filter text.
  fn visible(&self) -> Vec<&MaintenanceSchedule> {
    let filter = self.search.query().to_lowercase();
    self
      .query
      .data()
      .map(|schedules| {
        schedules
          .iter()
          .filter(|s| {
            filter.is_empty()
              || s.fountain_id.to_lowercase().contains(&filter)
              || s
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&filter))
                .unwrap_or(false)
          })
          .collect()
      })
      .unwrap_or_default()
  }
}

impl View for ScheduleListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let the filter component try to handle first
    match self.search.handle_key(key) {
      KeyResult::Handled | KeyResult::Event(_) => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let len = visible.len();

    let title = if self.query.is_loading() {
      " Maintenance (loading...) ".to_string()
    } else if let Some(e) = self.query.error() {
      format!(" Maintenance (error: {}) ", truncate(e, 40))
    } else {
      format!(" Maintenance ({}) ", len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() && self.query.data().is_none() {
        "Failed to load schedules. Press 'r' to retry."
      } else if !self.search.query().is_empty() {
        "No schedules match the filter."
      } else {
        "Nothing scheduled."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      self.search.render_overlay(frame, area);
      return;
    }

    let items: Vec<ListItem> = visible
      .iter()
      .map(|schedule| {
        let line = Line::from(vec![
          Span::styled(
            format!("{}  ", schedule.scheduled_date),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<12}", schedule.maintenance_type),
            Style::default().fg(Color::White),
          ),
          Span::styled(
            format!("{:<13}", schedule.status),
            Style::default().fg(schedule_color(schedule.status)),
          ),
          Span::styled(
            format!("[{}]  ", schedule.fountain_id),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(truncate(schedule.description.as_deref().unwrap_or(""), 40)),
        ]);
        ListItem::new(line)
      })
      .collect();

    ensure_valid_selection(&mut self.list_state, len);

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Maintenance".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refresh_if_stale();
  }
}

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;

use crate::ai::client::AiClient;
use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::mutations::MutationDispatcher;
use crate::gateway::types::Fountain;
use crate::query::Query;
use crate::ui::components::{KeyResult, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::FountainDetailView;

/// View for displaying the fountain fleet
pub struct FountainListView {
  gateway: CachedGatewayClient,
  dispatcher: MutationDispatcher,
  ai: AiClient,
  query: Query<Vec<Fountain>>,
  list_state: ListState,
  search: SearchInput,
}

impl FountainListView {
  pub fn new(
    gateway: CachedGatewayClient,
    dispatcher: MutationDispatcher,
    ai: AiClient,
  ) -> Self {
    let gateway_for_query = gateway.clone();
    let mut query = Query::new(move || {
      let gateway = gateway_for_query.clone();
      async move {
        gateway
          .fountains()
          .await
          .map(|r| r.data)
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(Duration::from_secs(30));

    // Start fetching immediately
    query.fetch();

    Self {
      gateway,
      dispatcher,
      ai,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  /// Fountains matching the current filter text.
  fn visible(&self) -> Vec<&Fountain> {
    let filter = self.search.query().to_lowercase();
    self
      .query
      .data()
      .map(|fountains| {
        fountains
          .iter()
          .filter(|f| {
            filter.is_empty()
              || f.name.to_lowercase().contains(&filter)
              || f.location.to_lowercase().contains(&filter)
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let len = visible.len();

    let title = if self.query.is_loading() {
      " Fountains (loading...) ".to_string()
    } else if let Some(e) = self.query.error() {
      format!(" Fountains (error: {}) ", truncate(e, 40))
    } else {
      format!(" Fountains ({}) ", len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() && self.query.data().is_none() {
        "Failed to load fountains. Press 'r' to retry."
      } else if !self.search.query().is_empty() {
        "No fountains match the filter."
      } else {
        "No fountains found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = visible
      .iter()
      .map(|fountain| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&fountain.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<12}", fountain.status),
            Style::default().fg(status_color(fountain.status)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<28}", truncate(&fountain.location, 28))),
          Span::styled(
            match fountain.water_flow_rate {
              Some(rate) => format!("{:>8.1} L/min", rate),
              None => format!("{:>14}", "-"),
            },
            Style::default().fg(Color::DarkGray),
          ),
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
  }
}

impl View for FountainListView {
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
      KeyCode::Enter => {
        if let Some(idx) = self.list_state.selected() {
          if let Some(fountain) = self.visible().get(idx) {
            return ViewAction::Push(Box::new(FountainDetailView::new(
              fountain.id.clone(),
              fountain.name.clone(),
              self.gateway.clone(),
              self.dispatcher.clone(),
              self.ai.clone(),
            )));
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Fountains".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refresh_if_stale();
  }
}

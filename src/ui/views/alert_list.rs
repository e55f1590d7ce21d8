use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::mutations::MutationDispatcher;
use crate::gateway::types::Alert;
use crate::query::Query;
use crate::ui::components::{KeyResult, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{severity_color, truncate};
use crate::ui::view::{View, ViewAction};

/// Who alert resolutions are attributed to.
///
/// TODO: read the operator name from config once sign-off is required.
const RESOLVED_BY: &str = "dashboard-operator";

/// View for browsing and resolving alerts
pub struct AlertListView {
  gateway: CachedGatewayClient,
  dispatcher: MutationDispatcher,
  /// None = all alerts, Some(false) = open only, Some(true) = resolved only
  resolved_filter: Option<bool>,
  query: Query<Vec<Alert>>,
  list_state: ListState,
  search: SearchInput,
  pending_resolve: Option<oneshot::Receiver<bool>>,
}

impl AlertListView {
  pub fn new(gateway: CachedGatewayClient, dispatcher: MutationDispatcher) -> Self {
    let resolved_filter = Some(false);
    let query = Self::build_query(&gateway, resolved_filter);

    Self {
      gateway,
      dispatcher,
      resolved_filter,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      pending_resolve: None,
    }
  }

  /// Alerts matching the current filter text, in display order.
  fn visible(&self) -> Vec<&Alert> {
    let filter = self.search.query().to_lowercase();
    self
      .query
      .data()
      .map(|alerts| {
        alerts
          .iter()
          .filter(|a| filter.is_empty() || a.title.to_lowercase().contains(&filter))
          .collect()
      })
      .unwrap_or_default()
  }

  fn build_query(gateway: &CachedGatewayClient, resolved: Option<bool>) -> Query<Vec<Alert>> {
    let gateway = gateway.clone();
    let mut query = Query::new(move || {
      let gateway = gateway.clone();
      async move {
        gateway
          .alerts(resolved)
          .await
          .map(|r| r.data)
          .map_err(|e| e.to_string())
      }
    })
    .with_stale_time(Duration::from_secs(15));
    query.fetch();
    query
  }

  fn filter_label(&self) -> &'static str {
    match self.resolved_filter {
      Some(false) => "open",
      Some(true) => "resolved",
      None => "all",
    }
  }

  fn cycle_filter(&mut self) {
    self.resolved_filter = match self.resolved_filter {
      Some(false) => None,
      None => Some(true),
      Some(true) => Some(false),
    };
    self.query = Self::build_query(&self.gateway, self.resolved_filter);
  }

  fn resolve_selected(&mut self) {
    if self.pending_resolve.is_some() {
      return;
    }
    let Some(idx) = self.list_state.selected() else {
      return;
    };
    let visible = self.visible();
    let Some(alert) = visible.get(idx) else {
      return;
    };
    if alert.is_resolved {
      return;
    }

    let dispatcher = self.dispatcher.clone();
    let id = alert.id.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let ok = dispatcher.resolve_alert(&id, RESOLVED_BY).await.is_ok();
      let _ = tx.send(ok);
    });
    self.pending_resolve = Some(rx);
  }
}

impl View for AlertListView {
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
      KeyCode::Char('t') => {
        self.cycle_filter();
      }
      KeyCode::Char('x') | KeyCode::Enter => {
        self.resolve_selected();
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
      format!(" Alerts [{}] (loading...) ", self.filter_label())
    } else if let Some(e) = self.query.error() {
      format!(" Alerts [{}] (error: {}) ", self.filter_label(), truncate(e, 40))
    } else {
      format!(" Alerts [{}] ({}) ", self.filter_label(), len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.error().is_some() && self.query.data().is_none() {
        "Failed to load alerts. Press 'r' to retry."
      } else if !self.search.query().is_empty() {
        "No alerts match the filter."
      } else {
        "No alerts. <t> cycles open/all/resolved."
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
      .map(|alert| {
        let resolved_marker = if alert.is_resolved { "✓ " } else { "  " };
        let line = Line::from(vec![
          Span::styled(
            format!("{:<10}", alert.severity),
            Style::default().fg(severity_color(alert.severity)).bold(),
          ),
          Span::styled(
            format!("{:<16}", alert.alert_type),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(resolved_marker),
          Span::raw(truncate(&alert.title, 48)),
          Span::styled(
            alert
              .fountain_id
              .as_deref()
              .map(|id| format!("  [{}]", id))
              .unwrap_or_default(),
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
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Alerts [{}]", self.filter_label())
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refresh_if_stale();

    if let Some(rx) = &mut self.pending_resolve {
      match rx.try_recv() {
        Ok(success) => {
          self.pending_resolve = None;
          if success {
            // The alerts family was invalidated; this read must hit the
            // gateway, not the pre-resolve cache.
            self.query.refetch();
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {}
        Err(oneshot::error::TryRecvError::Closed) => {
          self.pending_resolve = None;
        }
      }
    }
  }
}

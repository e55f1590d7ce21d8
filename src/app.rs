use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::io::stdout;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::ai::client::AiClient;
use crate::commands;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::gateway::cached_client::CachedGatewayClient;
use crate::gateway::client::GatewayClient;
use crate::gateway::mutations::MutationDispatcher;
use crate::notify::{Notification, Notifier, NotifyKind};
use crate::ui::renderfns::draw_header;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{AlertListView, FountainListView, OverviewView, ScheduleListView};

/// How long a toast stays visible in the status bar.
const TOAST_DURATION: Duration = Duration::from_secs(4);

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  config: Config,

  gateway: CachedGatewayClient,
  dispatcher: MutationDispatcher,
  ai: AiClient,

  /// Receiver for mutation toasts, handed to the event handler on run
  notices: Option<mpsc::UnboundedReceiver<Notification>>,

  /// Currently displayed toast, if any
  toast: Option<(Notification, Instant)>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let gateway = CachedGatewayClient::new(GatewayClient::new(&config)?);
    let (notifier, notices) = Notifier::channel();
    let dispatcher = MutationDispatcher::new(&gateway, notifier);
    let ai = AiClient::new(&config);

    let mut app = Self {
      view_stack: Vec::new(),
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      config,
      gateway,
      dispatcher,
      ai,
      notices: Some(notices),
      toast: None,
      should_quit: false,
    };

    let initial = app
      .config
      .default_view
      .clone()
      .unwrap_or_else(|| "overview".to_string());
    let root = app
      .root_view(&initial)
      .unwrap_or_else(|| Box::new(OverviewView::new(app.gateway.clone())));
    app.view_stack.push(root);

    Ok(app)
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let notices = self
      .notices
      .take()
      .ok_or_else(|| color_eyre::eyre::eyre!("App is already running"))?;
    let mut events = EventHandler::new(Duration::from_millis(250), notices);

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn root_view(&self, name: &str) -> Option<Box<dyn View>> {
    match name {
      "overview" => Some(Box::new(OverviewView::new(self.gateway.clone()))),
      "fountains" => Some(Box::new(FountainListView::new(
        self.gateway.clone(),
        self.dispatcher.clone(),
        self.ai.clone(),
      ))),
      "alerts" => Some(Box::new(AlertListView::new(
        self.gateway.clone(),
        self.dispatcher.clone(),
      ))),
      "schedules" => Some(Box::new(ScheduleListView::new(self.gateway.clone()))),
      _ => None,
    }
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if let Some(view) = self.view_stack.last_mut() {
          view.tick();
        }
        if let Some((_, shown_at)) = &self.toast {
          if shown_at.elapsed() > TOAST_DURATION {
            self.toast = None;
          }
        }
      }
      Event::Notice(notification) => {
        self.toast = Some((notification, Instant::now()));
      }
    }
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char(':') {
      self.mode = Mode::Command;
      self.command_input.clear();
      self.selected_suggestion = 0;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    // Execute either the selected suggestion or the literal input
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    if cmd == "quit" {
      self.should_quit = true;
    } else if let Some(view) = self.root_view(&cmd) {
      self.view_stack.clear();
      self.view_stack.push(view);
    }
    self.command_input.clear();
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Status bar
      ])
      .split(frame.area());

    let breadcrumb = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect::<Vec<_>>()
      .join(" > ");
    let context = self
      .config
      .title
      .as_deref()
      .unwrap_or(&self.config.gateway.url);
    draw_header(frame, chunks[0], context, &breadcrumb);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    self.draw_status_bar(frame, chunks[2]);
  }

  fn draw_status_bar(&self, frame: &mut Frame, area: Rect) {
    // A live toast outranks the key hints
    if let Some((toast, shown_at)) = &self.toast {
      if shown_at.elapsed() <= TOAST_DURATION {
        let style = match toast.kind {
          NotifyKind::Success => Style::default().fg(Color::Green),
          NotifyKind::Error => Style::default().fg(Color::Red),
        };
        frame.render_widget(Paragraph::new(toast.message.clone()).style(style), area);
        return;
      }
    }

    let (content, style) = match self.mode {
      Mode::Normal => {
        let hint = " :command  /filter  j/k:nav  Enter:select  r:refresh  q:back  Ctrl-C:quit";
        (hint.to_string(), Style::default().fg(Color::DarkGray))
      }
      Mode::Command => {
        let suggestions = commands::get_suggestions(&self.command_input);
        let mut content = format!(":{}", self.command_input);
        if !suggestions.is_empty() {
          let names: Vec<String> = suggestions
            .iter()
            .enumerate()
            .map(|(i, cmd)| {
              if i == self.selected_suggestion {
                format!("[{}]", cmd.name)
              } else {
                cmd.name.to_string()
              }
            })
            .collect();
          content.push_str(&format!("   {}", names.join(" ")));
        }
        (content, Style::default().fg(Color::Yellow))
      }
    };

    frame.render_widget(Paragraph::new(content).style(style), area);
  }
}

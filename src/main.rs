mod ai;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod gateway;
mod logging;
mod notify;
mod query;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::ai::service::AiServiceConfig;

#[derive(Parser, Debug)]
#[command(name = "aquamon")]
#[command(about = "A terminal dashboard for drinking-fountain fleet monitoring")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/aquamon/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// View to open at startup: overview, fountains, alerts or schedules
  #[arg(short, long)]
  view: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Serve the AI stub endpoints instead of running the dashboard
  ServeAi {
    /// Listen address, e.g. 127.0.0.1:8787
    #[arg(short, long)]
    listen: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  if let Some(Command::ServeAi { listen }) = args.command {
    logging::init_stdout();

    let listen = listen.unwrap_or_else(|| config.ai.listen.clone());
    let listen = listen
      .parse()
      .map_err(|e| eyre!("Invalid listen address '{}': {}", listen, e))?;
    let service_config = AiServiceConfig {
      allowed_origins: config.ai.allowed_origins.clone(),
    };
    return ai::service::serve(listen, service_config).await;
  }

  // The TUI owns the terminal; diagnostics go to a file
  let _log_guard = logging::init_file()?;

  // Override initial view if specified on command line
  let config = if let Some(view) = args.view {
    config::Config {
      default_view: Some(view),
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

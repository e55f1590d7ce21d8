//! Tracing setup.
//!
//! While the dashboard runs it owns the terminal, so diagnostics go to a
//! rolling file under the user data directory. The `serve-ai` subcommand has
//! no TUI and logs to stdout like a normal service.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install file-based logging for the TUI. The returned guard must be kept
/// alive for buffered lines to flush.
pub fn init_file() -> Result<WorkerGuard> {
  let dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("aquamon")
    .join("logs");

  std::fs::create_dir_all(&dir).map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::daily(dir, "aquamon.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .init();

  Ok(guard)
}

/// Install stdout logging for the headless stub service.
pub fn init_stdout() {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_target(true)
    .compact()
    .init();
}

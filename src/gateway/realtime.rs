//! Per-fountain subscription to newly inserted sensor readings.
//!
//! The gateway's change-notification channel is consumed behind a narrow
//! interface: [`subscribe`] returns a cancellable handle delivering inserts
//! for one fountain. The current transport tails the append-only series with
//! periodic `recorded_at > last_seen` fetches; callers only see the handle,
//! so a push transport can replace the tailing without touching them.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use super::client::GatewayClient;
use super::types::SensorReading;

/// A live feed of readings for one fountain.
///
/// Holds the follower task; dropping (or `close`-ing) the handle tears the
/// channel down. Never rely on leaks for cleanup: a view that stops
/// observing a fountain must drop its stream.
pub struct ReadingStream {
  fountain_id: String,
  rx: mpsc::UnboundedReceiver<SensorReading>,
  task: JoinHandle<()>,
}

impl ReadingStream {
  #[allow(dead_code)]
  pub fn fountain_id(&self) -> &str {
    &self.fountain_id
  }

  /// Next delivered reading, if one has arrived. Non-blocking; call from the
  /// view's tick.
  pub fn try_next(&mut self) -> Option<SensorReading> {
    self.rx.try_recv().ok()
  }

  /// Explicitly tear the subscription down.
  pub fn close(self) {
    // Drop does the work.
  }
}

impl Drop for ReadingStream {
  fn drop(&mut self) {
    self.task.abort();
  }
}

/// Subscribe to readings inserted for `fountain_id` from now on.
pub fn subscribe(
  client: GatewayClient,
  fountain_id: String,
  poll_interval: Duration,
) -> ReadingStream {
  let (tx, rx) = mpsc::unbounded_channel();
  let id = fountain_id.clone();

  let task = tokio::spawn(async move {
    let mut last_seen = Utc::now();
    loop {
      tokio::time::sleep(poll_interval).await;

      match client.readings_since(&id, last_seen).await {
        Ok(readings) => {
          for reading in readings {
            if reading.recorded_at > last_seen {
              last_seen = reading.recorded_at;
            }
            if tx.send(reading).is_err() {
              // Receiver gone; the subscription is over.
              return;
            }
          }
        }
        Err(e) => {
          // Transient gap in the feed; the next tick retries naturally.
          warn!(fountain = %id, error = %e, "reading subscription poll failed");
        }
      }
    }
  });

  ReadingStream {
    fountain_id,
    rx,
    task,
  }
}

//! User-visible notifications (toasts) emitted by mutations.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
  Success,
  Error,
}

/// One toast message for the status bar.
#[derive(Debug, Clone)]
pub struct Notification {
  pub kind: NotifyKind,
  pub message: String,
}

/// Sending half of the notification channel.
///
/// Cloned into the mutation dispatcher; the app owns the receiving half and
/// renders notifications as transient toasts. Sends are fire-and-forget: if
/// the app is shutting down and the receiver is gone, the toast is dropped.
#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn success(&self, message: impl Into<String>) {
    let _ = self.tx.send(Notification {
      kind: NotifyKind::Success,
      message: message.into(),
    });
  }

  pub fn error(&self, message: impl Into<String>) {
    let _ = self.tx.send(Notification {
      kind: NotifyKind::Error,
      message: message.into(),
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_notifications_arrive_in_order() {
    let (notifier, mut rx) = Notifier::channel();
    notifier.success("Fountain updated");
    notifier.error("Failed to resolve alert");

    let first = rx.try_recv().unwrap();
    assert_eq!(first.kind, NotifyKind::Success);
    assert_eq!(first.message, "Fountain updated");

    let second = rx.try_recv().unwrap();
    assert_eq!(second.kind, NotifyKind::Error);
  }

  #[test]
  fn test_send_without_receiver_is_silent() {
    let (notifier, rx) = Notifier::channel();
    drop(rx);
    notifier.success("nobody listening");
  }
}

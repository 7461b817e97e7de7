use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Application-wide UI events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppEvent {
    Toast(Toast),
    Shortcut { key: String, action: ShortcutAction },
    HelpToggled { open: bool },
    /// A list changed through a control command and should be re-rendered.
    DataChanged { entity: String },
}

pub type EventReceiver = broadcast::Receiver<AppEvent>;

/// Explicit event bus for toasts, shortcuts and the help modal. Subscribers
/// live until their receiver is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
    help_open: Arc<AtomicBool>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            help_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event dropped, no subscribers");
        }
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.publish(AppEvent::Toast(Toast {
            level,
            message: message.into(),
        }));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Error, message);
    }

    pub fn help_open(&self) -> bool {
        self.help_open.load(Ordering::SeqCst)
    }

    /// Flip the help modal and announce its new state.
    pub fn toggle_help(&self) -> bool {
        let open = !self.help_open.fetch_xor(true, Ordering::SeqCst);
        self.publish(AppEvent::HelpToggled { open });
        open
    }

    /// Resolve `key` against `registry` and publish the result.
    pub fn dispatch_key(&self, registry: &ShortcutRegistry, key: &str) -> Option<ShortcutAction> {
        let action = registry.lookup(key)?;
        self.publish(AppEvent::Shortcut {
            key: key.to_string(),
            action,
        });
        match action {
            ShortcutAction::ToggleHelp => {
                self.toggle_help();
            }
            ShortcutAction::CloseDialog if self.help_open() => {
                self.toggle_help();
            }
            _ => {}
        }
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toast_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.error("Could not toggle rule");

        for rx in [&mut a, &mut b] {
            let event = rx.recv().await.unwrap();
            assert_eq!(
                event,
                AppEvent::Toast(Toast {
                    level: ToastLevel::Error,
                    message: "Could not toggle rule".into(),
                })
            );
        }
    }

    #[tokio::test]
    async fn help_shortcut_toggles_modal() {
        let bus = EventBus::default();
        let reg = ShortcutRegistry::default();
        let mut rx = bus.subscribe();

        assert_eq!(bus.dispatch_key(&reg, "?"), Some(ShortcutAction::ToggleHelp));
        assert!(matches!(rx.recv().await.unwrap(), AppEvent::Shortcut { .. }));
        assert_eq!(rx.recv().await.unwrap(), AppEvent::HelpToggled { open: true });

        bus.dispatch_key(&reg, "Escape");
        rx.recv().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), AppEvent::HelpToggled { open: false });
        assert!(!bus.help_open());
    }

    #[test]
    fn dropped_subscriber_is_released() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
        bus.success("nobody listening");
        assert_eq!(bus.dispatch_key(&ShortcutRegistry::default(), "x"), None);
    }
}

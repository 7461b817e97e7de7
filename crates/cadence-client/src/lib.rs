//! Async runtime for the cadence dashboard: a typed REST client, scoped
//! background work, pollers, the UI event bus and control panels.

pub mod client;
pub mod controls;
pub mod error;
pub mod events;
pub mod inbox;
pub mod poller;
pub mod scope;
pub mod shortcuts;

pub use client::ApiClient;
pub use controls::{ControlPanel, Remote};
pub use error::{ClientError, Result};
pub use events::{AppEvent, EventBus, Toast, ToastLevel};
pub use inbox::InboxPanel;
pub use poller::{InFlight, Poller};
pub use scope::{Scope, ScopeHandle};
pub use shortcuts::{ShortcutAction, ShortcutRegistry};

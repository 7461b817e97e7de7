use cadence_core::rule::RuleRun;
use cadence_core::types::RunStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use crate::store::Store;

/// Delay before a retried run is marked successful.
pub const RETRY_SETTLE: Duration = Duration::from_millis(250);

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    /// Every run created or updated is published here for the SSE stream.
    pub run_tx: broadcast::Sender<RuleRun>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            store: Arc::new(RwLock::new(store)),
            run_tx: tx,
        }
    }

    pub fn publish(&self, run: RuleRun) {
        // No subscribers is fine.
        let _ = self.run_tx.send(run);
    }

    /// Finish a retried run in the background once `RETRY_SETTLE` elapses.
    pub fn settle_later(&self, run_id: String) {
        let app = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RETRY_SETTLE).await;
            let finished = app.store.write().await.finish_run(&run_id, RunStatus::Success);
            match finished {
                Ok(run) => app.publish(run),
                Err(e) => tracing::warn!(run_id, error = %e, "retried run vanished"),
            }
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Store::default())
    }
}

//! Lifetime tokens for background work.
//!
//! A [`Scope`] is owned by whatever view started the work. Dropping it (or
//! calling [`Scope::cancel`]) resolves every pending [`ScopeHandle::run`]
//! with [`ClientError::Cancelled`] and drops the wrapped future, so a
//! response arriving after teardown never reaches state.

use crate::error::{ClientError, Result};
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct Scope {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct ScopeHandle {
    rx: watch::Receiver<bool>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn handle(&self) -> ScopeHandle {
        ScopeHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.tx.send_replace(true);
    }
}

impl ScopeHandle {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the owning scope is cancelled or dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Drive `fut` unless the scope ends first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ClientError::Cancelled),
            out = fut => Ok(out),
        }
    }

    pub fn spawn<F>(&self, fut: F) -> JoinHandle<Result<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.clone();
        tokio::spawn(async move { handle.run(fut).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_while_scope_alive() {
        let scope = Scope::new();
        let out = scope.handle().run(async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn drop_cancels_pending_work() {
        let scope = Scope::new();
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let task = scope.handle().spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(scope);

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("task should end promptly")
            .unwrap();
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelled_scope_rejects_new_work() {
        let scope = Scope::new();
        let handle = scope.handle();
        scope.cancel();
        assert!(scope.is_cancelled());
        assert!(matches!(handle.run(async { 1 }).await, Err(ClientError::Cancelled)));
    }
}

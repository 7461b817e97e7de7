use crate::error::Result;
use crate::scope::ScopeHandle;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

/// Allows at most one fetch at a time.
#[derive(Debug, Clone)]
pub struct InFlight {
    sem: Arc<Semaphore>,
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self {
            sem: Arc::new(Semaphore::new(1)),
        }
    }

    /// `None` while another fetch holds the guard.
    pub fn try_begin(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.sem).try_acquire_owned().ok()
    }

    pub fn is_busy(&self) -> bool {
        self.sem.available_permits() == 0
    }
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
}

/// Abort handle of the fetch currently running, if any.
type FetchSlot = Arc<Mutex<Option<AbortHandle>>>;

/// Fixed-interval fetch loop bound to a [`ScopeHandle`].
///
/// Ticks that land while a fetch is running are skipped, not queued. The
/// last successful value is published on a `watch` channel; a failed fetch
/// is logged and leaves that value untouched.
pub struct Poller<T> {
    name: &'static str,
    rx: watch::Receiver<Option<T>>,
    in_flight: InFlight,
    wake: Arc<Notify>,
    counters: Arc<Counters>,
    task: JoinHandle<()>,
    current_fetch: FetchSlot,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, scope: ScopeHandle, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let in_flight = InFlight::new();
        let wake = Arc::new(Notify::new());
        let counters = Arc::new(Counters::default());
        let current_fetch = FetchSlot::default();

        let task = tokio::spawn(run_loop(
            name,
            every,
            scope,
            Arc::new(fetch),
            tx,
            in_flight.clone(),
            Arc::clone(&wake),
            Arc::clone(&counters),
            Arc::clone(&current_fetch),
        ));

        Self {
            name,
            rx,
            in_flight,
            wake,
            counters,
            task,
            current_fetch,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.rx.clone()
    }

    /// Ask for an immediate fetch. Ignored (returns `false`) while one is
    /// already in flight.
    pub fn refresh_now(&self) -> bool {
        if self.in_flight.is_busy() {
            tracing::debug!(poller = self.name, "refresh ignored, fetch in flight");
            return false;
        }
        self.wake.notify_one();
        true
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_busy()
    }

    pub fn fetch_count(&self) -> u64 {
        self.counters.fetches.load(Ordering::Relaxed)
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.counters.skipped.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
        if let Ok(mut slot) = self.current_fetch.lock() {
            if let Some(fetch) = slot.take() {
                fetch.abort();
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop<T, F, Fut>(
    name: &'static str,
    every: Duration,
    scope: ScopeHandle,
    fetch: Arc<F>,
    tx: watch::Sender<Option<T>>,
    in_flight: InFlight,
    wake: Arc<Notify>,
    counters: Arc<Counters>,
    current_fetch: FetchSlot,
) where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let tx = Arc::new(tx);
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = scope.cancelled() => {
                tracing::debug!(poller = name, "scope ended, poller stopping");
                break;
            }
            _ = ticker.tick() => {}
            () = wake.notified() => {}
        }

        let Some(permit) = in_flight.try_begin() else {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(poller = name, "tick skipped, fetch in flight");
            continue;
        };

        counters.fetches.fetch_add(1, Ordering::Relaxed);
        let fut = fetch();
        let tx = Arc::clone(&tx);
        let counters = Arc::clone(&counters);
        let fetch_task = scope.spawn(async move {
            let _permit = permit;
            match fut.await {
                Ok(value) => {
                    tx.send_replace(Some(value));
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(poller = name, error = %e, "poll failed");
                }
            }
        });
        if let Ok(mut slot) = current_fetch.lock() {
            *slot = Some(fetch_task.abort_handle());
        }
    }
}

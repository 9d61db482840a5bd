//! Background sweeping of idle sessions.

use std::time::Duration;

use keepsake_session::SharedStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running sweep task.
///
/// The task sweeps immediately, then once per interval, until
/// [`shutdown`](Self::shutdown) is called or its token is cancelled.
pub struct GcTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl GcTask {
    /// Spawn a sweep task on the current runtime.
    pub fn spawn(store: SharedStore, max_idle: Duration, interval: Duration) -> Self {
        Self::spawn_with_token(store, max_idle, interval, CancellationToken::new())
    }

    /// Spawn a sweep task stopped by `cancel`.
    pub fn spawn_with_token(
        store: SharedStore,
        max_idle: Duration,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let period = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            info!(
                backend = store.kind(),
                max_idle_secs = max_idle.as_secs(),
                interval_ms = period.as_millis() as u64,
                "Session GC task started"
            );

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = store.sweep(max_idle);
                        if report.evicted_count() > 0 {
                            debug!(
                                evicted = report.evicted_count(),
                                remaining = store.len(),
                                "GC sweep evicted idle sessions"
                            );
                        }
                    }
                }
            }

            info!(backend = store.kind(), "Session GC task stopped");
        });

        Self { cancel, handle }
    }

    /// Token that stops this task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session GC task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_session::{ManualClock, MemoryStore};
    use std::sync::Arc;

    fn store() -> (SharedStore, ManualClock) {
        let clock = ManualClock::new();
        let store: SharedStore = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        (store, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_runs_immediately() {
        let (store, clock) = store();
        store.init("stale").unwrap();
        clock.advance(Duration::from_secs(120));

        let task = GcTask::spawn(
            Arc::clone(&store),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(store.is_empty());
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_repeat_on_interval() {
        let (store, clock) = store();
        let task = GcTask::spawn(
            Arc::clone(&store),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_millis(1)).await;

        store.init("a").unwrap();
        clock.advance(Duration::from_secs(61));
        assert!(store.exists("a"));

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!store.exists("a"));
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let (store, clock) = store();
        let task = GcTask::spawn(
            Arc::clone(&store),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let token = task.cancellation_token();
        task.shutdown().await;
        assert!(token.is_cancelled());

        store.init("a").unwrap();
        clock.advance(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(store.exists("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_token_stops_task() {
        let (store, _) = store();
        let cancel = CancellationToken::new();
        let task = GcTask::spawn_with_token(
            store,
            Duration::from_secs(1),
            Duration::from_secs(1),
            cancel.clone(),
        );

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(task.is_finished());
    }
}

// crates/server/src/watcher.rs
//! Polling file watcher: runs an incremental sync on a fixed interval,
//! skipping ticks that fall inside the debounce window of the last sync.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cclog_core::SessionSource;
use cclog_db::{sync_incremental, Database, DbResult, SyncResult};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::WatcherConfig;

/// How long [`FileWatcher::stop`] waits for the loop to acknowledge.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// One synchronization pass, as triggered by the watcher.
#[async_trait]
pub trait SyncTrigger: Send + Sync + 'static {
    async fn run_sync(&self) -> DbResult<SyncResult>;
}

/// Incremental sync of a [`Database`] from a [`SessionSource`].
pub struct IncrementalSync {
    db: Database,
    source: Arc<dyn SessionSource>,
}

impl IncrementalSync {
    pub fn new(db: Database, source: Arc<dyn SessionSource>) -> Self {
        Self { db, source }
    }
}

#[async_trait]
impl SyncTrigger for IncrementalSync {
    async fn run_sync(&self) -> DbResult<SyncResult> {
        sync_incremental(&self.db, self.source.as_ref()).await
    }
}

struct WatchLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct FileWatcher {
    trigger: Arc<dyn SyncTrigger>,
    interval: Duration,
    debounce: Duration,
    last_sync: Arc<Mutex<Option<Instant>>>,
    running: Mutex<Option<WatchLoop>>,
}

impl FileWatcher {
    pub fn new(trigger: Arc<dyn SyncTrigger>, config: &WatcherConfig) -> Self {
        Self {
            trigger,
            interval: config.interval,
            debounce: config.debounce,
            last_sync: Arc::new(Mutex::new(None)),
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Completion time of the most recent sync, successful or not.
    pub fn last_sync(&self) -> Option<Instant> {
        *self.last_sync.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling. The first tick fires one interval from now and is
    /// always eligible. No-op when already running.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return;
        }
        *self.last_sync.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watch_loop(
            self.trigger.clone(),
            self.interval,
            self.debounce,
            self.last_sync.clone(),
            cancel.clone(),
        ));
        *running = Some(WatchLoop { cancel, handle });
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            debounce_secs = self.debounce.as_secs(),
            "File watcher started"
        );
    }

    /// Stop scheduling ticks and wait briefly for the loop to exit.
    ///
    /// A sync already in flight finishes on its own. No-op when not running.
    pub async fn stop(&self) {
        let Some(watch) = self.running.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        watch.cancel.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, watch.handle).await {
            Ok(Ok(())) => tracing::info!("File watcher stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "File watcher task ended abnormally"),
            Err(_) => tracing::warn!("File watcher did not stop within timeout"),
        }
    }
}

async fn watch_loop(
    trigger: Arc<dyn SyncTrigger>,
    interval: Duration,
    debounce: Duration,
    last_sync: Arc<Mutex<Option<Instant>>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let previous = *last_sync.lock().unwrap_or_else(|e| e.into_inner());
        if previous.is_some_and(|at| at.elapsed() < debounce) {
            continue;
        }

        match trigger.run_sync().await {
            Ok(result) if result.sessions_synced > 0 || result.error_count > 0 => tracing::info!(
                synced = result.sessions_synced,
                errors = result.error_count,
                "Watcher sync finished"
            ),
            Ok(_) => tracing::debug!("Watcher sync: no changes"),
            Err(e) => tracing::warn!(error = %e, "Watcher sync failed"),
        }
        *last_sync.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cclog_db::DbError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSync {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSync {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncTrigger for CountingSync {
        async fn run_sync(&self) -> DbResult<SyncResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DbError::InvalidInput("source unavailable".into()))
            } else {
                Ok(SyncResult::default())
            }
        }
    }

    fn config(interval: u64, debounce: u64) -> WatcherConfig {
        WatcherConfig {
            enabled: true,
            interval: Duration::from_secs(interval),
            debounce: Duration::from_secs(debounce),
        }
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_syncs_and_debounce_skips() {
        let sync = CountingSync::new(false);
        let watcher = FileWatcher::new(sync.clone(), &config(10, 25));
        assert_eq!(watcher.last_sync(), None);

        watcher.start();
        sleep_secs(5.0).await;
        assert_eq!(sync.calls(), 0);

        sleep_secs(5.5).await; // t = 10.5: first tick
        assert_eq!(sync.calls(), 1);
        assert!(watcher.last_sync().is_some());

        sleep_secs(20.0).await; // ticks at 20 and 30 are inside the window
        assert_eq!(sync.calls(), 1);

        sleep_secs(10.0).await; // t = 40.5
        assert_eq!(sync.calls(), 2);

        watcher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sync_still_starts_debounce_window() {
        let sync = CountingSync::new(true);
        let watcher = FileWatcher::new(sync.clone(), &config(10, 25));
        watcher.start();

        sleep_secs(30.5).await;
        assert_eq!(sync.calls(), 1);
        assert!(watcher.last_sync().is_some());

        sleep_secs(10.0).await;
        assert_eq!(sync.calls(), 2);

        watcher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let sync = CountingSync::new(false);
        let watcher = FileWatcher::new(sync.clone(), &config(10, 1));
        watcher.start();
        watcher.start();
        assert!(watcher.is_running());

        sleep_secs(10.5).await;
        assert_eq!(sync.calls(), 1);

        watcher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let sync = CountingSync::new(false);
        let watcher = FileWatcher::new(sync.clone(), &config(10, 1));

        // Not running yet: no-op.
        watcher.stop().await;

        watcher.start();
        sleep_secs(10.5).await;
        watcher.stop().await;
        assert!(!watcher.is_running());

        sleep_secs(60.0).await;
        assert_eq!(sync.calls(), 1);

        // Restart resets the debounce marker.
        watcher.start();
        assert_eq!(watcher.last_sync(), None);
        sleep_secs(10.5).await;
        assert_eq!(sync.calls(), 2);
        watcher.stop().await;
    }
}

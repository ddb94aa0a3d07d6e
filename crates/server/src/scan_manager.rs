// crates/server/src/scan_manager.rs
//! One-at-a-time background synchronization with pollable progress.
//!
//! [`ScanManager::start_scan`] launches a full sync pass on a Tokio task and
//! returns immediately. Readers call [`ScanManager::progress`] for a copy of
//! the current [`ScanProgress`]; the task is the only writer.

use std::sync::{Arc, Mutex, RwLock};

use cclog_core::SessionSource;
use cclog_db::{sync_all_with, Database, SyncResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use ts_rs::TS;

/// Recorded as the last error when a scan is stopped before it finishes.
pub const CANCELLED_MESSAGE: &str = "scan cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub status: ScanStatus,
    pub projects_processed: usize,
    pub sessions_found: usize,
    pub sessions_synced: usize,
    pub sessions_skipped: usize,
    pub error_count: usize,
    #[ts(type = "string | null")]
    pub started_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ScanProgress {
    fn running() -> Self {
        Self {
            status: ScanStatus::Running,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    fn copy_counts(&mut self, result: &SyncResult) {
        self.projects_processed = result.projects_processed;
        self.sessions_found = result.sessions_found;
        self.sessions_synced = result.sessions_synced;
        self.sessions_skipped = result.sessions_skipped;
        self.error_count = result.error_count;
    }

    /// Terminal state for a finished pass.
    fn finish(&mut self, outcome: Result<SyncResult, String>) {
        self.completed_at = Some(Utc::now());
        match outcome {
            Ok(result) => {
                self.copy_counts(&result);
                if result.cancelled {
                    self.status = ScanStatus::Failed;
                    self.last_error = Some(CANCELLED_MESSAGE.to_string());
                } else {
                    self.status = ScanStatus::Completed;
                    if result.error_count > 0 {
                        self.last_error =
                            Some(format!("{} errors occurred during scan", result.error_count));
                    }
                }
            }
            Err(message) => {
                self.status = ScanStatus::Failed;
                self.last_error = Some(message);
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("scan is already running")]
    AlreadyRunning,
}

struct RunningScan {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ScanManager {
    db: Database,
    source: Arc<dyn SessionSource>,
    progress: Arc<RwLock<ScanProgress>>,
    task: Mutex<Option<RunningScan>>,
}

impl ScanManager {
    pub fn new(db: Database, source: Arc<dyn SessionSource>) -> Self {
        Self {
            db,
            source,
            progress: Arc::new(RwLock::new(ScanProgress::default())),
            task: Mutex::new(None),
        }
    }

    /// Snapshot of the current progress.
    pub fn progress(&self) -> ScanProgress {
        read_progress(&self.progress)
    }

    pub fn is_running(&self) -> bool {
        self.progress().status == ScanStatus::Running
    }

    /// Reset progress to `running` and start a sync pass in the background.
    ///
    /// Fails with [`ScanError::AlreadyRunning`] without touching the running
    /// scan's progress.
    pub fn start_scan(&self) -> Result<(), ScanError> {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        {
            let mut progress = self.progress.write().unwrap_or_else(|e| e.into_inner());
            if progress.status == ScanStatus::Running {
                return Err(ScanError::AlreadyRunning);
            }
            *progress = ScanProgress::running();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scan(
            self.db.clone(),
            self.source.clone(),
            self.progress.clone(),
            cancel.clone(),
        ));
        *task = Some(RunningScan { cancel, handle });
        tracing::info!("Scan started");
        Ok(())
    }

    /// Request cancellation and wait for the scan task to exit.
    ///
    /// Afterwards the status is `completed` or `failed`. No-op when no scan
    /// was started.
    pub async fn stop(&self) {
        let running = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(running) = running {
            running.cancel.cancel();
            self.join(running.handle).await;
        }
    }

    /// Wait for the current scan, if any, to finish on its own.
    pub async fn wait(&self) {
        let running = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(running) = running {
            self.join(running.handle).await;
        }
    }

    async fn join(&self, handle: JoinHandle<()>) {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scan task ended abnormally");
            let mut progress = self.progress.write().unwrap_or_else(|e| e.into_inner());
            if progress.status == ScanStatus::Running {
                progress.finish(Err(format!("scan task failed: {e}")));
            }
        }
    }
}

fn read_progress(progress: &RwLock<ScanProgress>) -> ScanProgress {
    progress.read().unwrap_or_else(|e| e.into_inner()).clone()
}

async fn run_scan(
    db: Database,
    source: Arc<dyn SessionSource>,
    progress: Arc<RwLock<ScanProgress>>,
    cancel: CancellationToken,
) {
    let live = progress.clone();
    let outcome = sync_all_with(&db, source.as_ref(), &cancel, move |partial| {
        live.write()
            .unwrap_or_else(|e| e.into_inner())
            .copy_counts(partial);
    })
    .await
    .map_err(|e| e.to_string());

    match &outcome {
        Ok(result) => tracing::info!(
            projects = result.projects_processed,
            synced = result.sessions_synced,
            errors = result.error_count,
            cancelled = result.cancelled,
            "Scan finished"
        ),
        Err(message) => tracing::error!(error = %message, "Scan failed"),
    }

    progress
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .finish(outcome);
}

// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use cclog_core::SessionSource;
use cclog_db::Database;

use crate::scan_manager::ScanManager;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle for session/project queries.
    pub db: Database,
    /// Where sessions are synchronized from.
    pub source: Arc<dyn SessionSource>,
    /// Background scan with pollable progress.
    pub scan: ScanManager,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(db: Database, source: Arc<dyn SessionSource>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            scan: ScanManager::new(db.clone(), source.clone()),
            db,
            source,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_manager::ScanStatus;
    use cclog_core::FileSessionSource;

    #[tokio::test]
    async fn test_new_state_is_idle() {
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(db, Arc::new(FileSessionSource::new("/nonexistent")));

        assert!(state.uptime_secs() < 5);
        assert_eq!(state.scan.progress().status, ScanStatus::Idle);
    }
}

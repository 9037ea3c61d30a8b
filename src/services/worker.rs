use crate::services::staging::StagingArea;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodically removes staging files nobody owns anymore, e.g. after a crash
/// mid-request. Live requests clean up after themselves.
pub struct BackgroundWorker {
    staging: Arc<StagingArea>,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        staging: Arc<StagingArea>,
        cleanup_age_hours: u64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            staging,
            max_age: Duration::from_secs(cleanup_age_hours * 3600),
            interval: Duration::from_secs(3600),
            shutdown,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Background worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    /// Returns how many files were removed.
    pub async fn perform_cleanup(&self) -> usize {
        tracing::info!("🧹 Sweeping staging directory {}", self.staging.root().display());

        let mut entries = match tokio::fs::read_dir(self.staging.root()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to read staging directory: {}", e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age < self.max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::info!("Removed orphaned staging file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to remove {}: {}", entry.path().display(), e);
                }
            }
        }

        tracing::info!("✅ Staging sweep completed, {} file(s) removed", removed);
        removed
    }
}

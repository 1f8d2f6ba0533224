use crate::services::workspace::WORKSPACE_PREFIX;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Removes workspaces left behind by requests that never reached cleanup
/// (crashed process, aborted runtime).
pub struct WorkspaceSweeper {
    root: PathBuf,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl WorkspaceSweeper {
    pub fn new(
        root: PathBuf,
        max_age: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            root,
            max_age,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Workspace sweeper started for {}", self.root.display());

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Workspace sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Deletes expired workspaces, returning how many were removed
    pub async fn sweep_once(&self) -> usize {
        tracing::debug!("🧹 Sweeping orphaned workspaces...");

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to read workspace root {}: {}", self.root.display(), e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(WORKSPACE_PREFIX) {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    tracing::info!("Removed orphaned workspace {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to remove {}: {}", entry.path().display(), e);
                }
            }
        }

        if removed > 0 {
            tracing::info!("✅ Workspace sweep removed {} directories", removed);
        }
        removed
    }
}

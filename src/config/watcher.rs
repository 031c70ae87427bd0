//! Token file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::gate::FileTokenRepository;

/// Watches the token file behind a [`FileTokenRepository`] and reloads the
/// table when the file changes.
///
/// The parent directory is watched rather than the file itself so that
/// editors which replace the file (write to temp, rename) are picked up.
pub struct TokenWatcher {
    repository: Arc<FileTokenRepository>,
    update_tx: mpsc::UnboundedSender<usize>,
}

impl TokenWatcher {
    /// Create a new TokenWatcher.
    ///
    /// Returns the watcher and a receiver that yields the token count after
    /// each successful reload.
    pub fn new(repository: Arc<FileTokenRepository>) -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                repository,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in the background. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.repository.path().to_path_buf();
        let dir = watch_dir(&path);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => self.handle(&event),
                Err(e) => tracing::error!(error = ?e, "Token watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Token watcher started");
        Ok(watcher)
    }

    fn handle(&self, event: &Event) {
        if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
            return;
        }
        if !touches(event, self.repository.path()) {
            return;
        }
        if !self.repository.path().exists() {
            // Mid-rename or deleted; the next create event reloads.
            tracing::warn!(path = ?self.repository.path(), "Token file missing, keeping current table");
            return;
        }

        tracing::info!("Token file change detected, reloading...");
        match self.repository.reload() {
            Ok(count) => {
                let _ = self.update_tx.send(count);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload token file. Keeping current table.");
            }
        }
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    event
        .paths
        .iter()
        .any(|p| p == target || p.file_name() == target.file_name())
}

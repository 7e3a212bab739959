//! Directive file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, LoadOutcome};
use crate::lifecycle::ConfigManager;

/// Monitors the directive file and runs a full load on every change.
pub struct ConfigWatcher {
    path: PathBuf,
    manager: Arc<ConfigManager>,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<LoadOutcome>,
}

impl ConfigWatcher {
    /// Create a watcher and the receiver for finished loads.
    ///
    /// The receiver gets loads that finalized; activating them is up to
    /// the caller.
    pub fn new(path: &Path, manager: Arc<ConfigManager>) -> (Self, mpsc::UnboundedReceiver<LoadOutcome>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                manager,
                poll_interval: Duration::from_secs(2),
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start watching. Events are handled on the watcher's own thread; the
    /// returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let manager = self.manager;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = %path.display(), "directive file change detected, reloading");
                        match load_config(&manager, &path) {
                            Ok(outcome) => {
                                let _ = tx.send(outcome);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "reload failed, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "watch error"),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "directive file watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Collaborators;
    use crate::process::DryRunProcess;
    use std::fs;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_change_triggers_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsyslog.conf");
        fs::write(&path, "*.* /var/log/all\n").unwrap();

        let collaborators = Collaborators::default().with_process(Arc::new(DryRunProcess::new()));
        let manager = Arc::new(ConfigManager::new(collaborators).unwrap());
        let (watcher, mut rx) = ConfigWatcher::new(&path, Arc::clone(&manager));
        let _handle = watcher.with_poll_interval(Duration::from_millis(100)).run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, "$MainMsgQueueSize 20000\n*.* /var/log/all\n").unwrap();

        // A truncate-then-write may surface as several events; wait for the
        // load that saw the full file.
        let outcome = timeout(Duration::from_secs(10), async {
            loop {
                let outcome = rx.recv().await.expect("an open channel");
                if outcome.candidate.record().main_queue.size == 20000 {
                    break outcome;
                }
            }
        })
        .await
        .expect("a reload within the timeout");
        assert!(outcome.report.fallback.is_none());
        assert_eq!(outcome.candidate.record().actions, 1);
    }
}

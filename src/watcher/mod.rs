//! File system watcher

mod event;

pub use event::{EventSource, FileEvent, FileEventKind};

use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Non-recursive watch on the directory whose new files get sorted.
///
/// Events are buffered in an unbounded channel, so a slow handler never
/// holds up the OS notification thread. Dropping the watcher releases the
/// subscription.
pub struct Watcher {
    watcher: Option<RecommendedWatcher>,
    root: PathBuf,
    rx: mpsc::UnboundedReceiver<FileEvent>,
}

impl Watcher {
    /// Subscribe to `root`.
    ///
    /// Fails if the directory does not exist or the OS refuses the watch;
    /// this is the one error callers are expected to handle.
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Watch directory does not exist: {}", root.display());
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    debug!("Event: {:?}", event.kind);
                    for file_event in FileEvent::from_notify(&event) {
                        if tx.send(file_event).is_err() {
                            // Receiver gone, the engine is shutting down
                            return;
                        }
                    }
                }
                Err(e) => error!("Watch error: {}", e),
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
        info!("Watching: {}", root.display());

        Ok(Self {
            watcher: Some(watcher),
            root: root.to_path_buf(),
            rx,
        })
    }

    /// The watched directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching. Already buffered events can still be drained.
    pub fn unwatch(&mut self) -> Result<()> {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.unwatch(&self.root)?;
            info!("Stopped watching: {}", self.root.display());
        }
        Ok(())
    }
}

impl EventSource for Watcher {
    fn next_event(&mut self) -> impl Future<Output = Option<FileEvent>> + Send {
        self.rx.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(Watcher::new(&tmp.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn test_reports_created_file() {
        let tmp = TempDir::new().unwrap();
        let mut watcher = Watcher::new(tmp.path()).unwrap();
        assert_eq!(watcher.root(), tmp.path());

        let file = tmp.path().join("invoice.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), watcher.next_event())
            .await
            .expect("no event within timeout")
            .expect("source closed");
        assert_eq!(
            event.path.file_name().and_then(|n| n.to_str()),
            Some("invoice.pdf")
        );

        watcher.unwatch().unwrap();
    }
}

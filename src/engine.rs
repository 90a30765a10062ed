//! Sort engine - decides what happens to each new file in the watched directory

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::rules::action::{ensure_destination, move_file, unique_destination};
use crate::rules::{SharedRuleSet, SortError};
use crate::watcher::{EventSource, FileEvent};

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Wait before moving, so the writer of a fresh download can let go of it
    pub lock_grace_period: Duration,

    /// How many events may be handled at once
    pub max_concurrent_moves: usize,

    /// How long shutdown waits for in-flight handlers before aborting them
    pub shutdown_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lock_grace_period: Duration::from_millis(500),
            max_concurrent_moves: 4,
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// Why an event left the file where it was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The path was gone (or not a regular file) by the time we looked
    Vanished,
    /// Sorting is switched off
    Disabled,
    /// No rule for this extension
    NoRule,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { to: PathBuf },
    Skipped(SkipReason),
    /// A rule matched but the move could not be done; the file stays put
    Abandoned,
}

/// Moves new files in the watched directory into per-extension folders
#[derive(Clone)]
pub struct SortEngine {
    root: Arc<Path>,
    rules: SharedRuleSet,
    options: EngineOptions,
    files_sorted: Arc<AtomicU64>,
    /// Serializes name resolution and rename so two handlers never pick the same target
    placement: Arc<Mutex<()>>,
}

impl SortEngine {
    pub fn new(root: impl Into<PathBuf>, rules: SharedRuleSet, options: EngineOptions) -> Self {
        let root: PathBuf = root.into();
        Self {
            root: Arc::from(root),
            rules,
            options,
            files_sorted: Arc::new(AtomicU64::new(0)),
            placement: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle to the live rules, for display and replacement
    pub fn rules(&self) -> &SharedRuleSet {
        &self.rules
    }

    /// Total number of files moved since the engine was created
    pub fn files_sorted(&self) -> u64 {
        self.files_sorted.load(Ordering::Relaxed)
    }

    /// Run one event through the pipeline.
    ///
    /// Never fails: every error is logged and turned into an [`Outcome`].
    pub async fn on_file_event(&self, event: &FileEvent) -> Outcome {
        let path = event.path.as_path();
        debug!("{:?}: {}", event.kind, path.display());

        if !path.is_file() {
            debug!("Skipping vanished file: {}", path.display());
            return Outcome::Skipped(SkipReason::Vanished);
        }

        let rules = self.rules.load();
        if !rules.is_enabled() {
            debug!("Sorting disabled, leaving {}", path.display());
            return Outcome::Skipped(SkipReason::Disabled);
        }

        let Some(rule) = rules.lookup_path(path) else {
            debug!("No rule for {}", path.display());
            return Outcome::Skipped(SkipReason::NoRule);
        };

        let Some(file_name) = path.file_name().map(Path::new) else {
            return Outcome::Skipped(SkipReason::Vanished);
        };

        let dir = match ensure_destination(&self.root, rule) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Abandoning {}: {}", path.display(), e);
                return Outcome::Abandoned;
            }
        };

        if !self.options.lock_grace_period.is_zero() {
            tokio::time::sleep(self.options.lock_grace_period).await;
        }

        match self.place(path, &dir, file_name) {
            Ok(to) => {
                self.files_sorted.fetch_add(1, Ordering::Relaxed);
                Outcome::Moved { to }
            }
            Err(SortError::Vanished(_)) => {
                debug!("File disappeared before moving: {}", path.display());
                Outcome::Skipped(SkipReason::Vanished)
            }
            Err(e @ SortError::Locked(_)) => {
                warn!("{}; leaving it in place", e);
                Outcome::Abandoned
            }
            Err(e) => {
                warn!("Abandoning {}: {}", path.display(), e);
                Outcome::Abandoned
            }
        }
    }

    /// Pick a free name in `dir` and move the file there
    fn place(&self, path: &Path, dir: &Path, file_name: &Path) -> Result<PathBuf, SortError> {
        let _guard = self
            .placement
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let to = unique_destination(dir, file_name)?;
        move_file(path, &to)?;
        Ok(to)
    }

    /// Where a file would be moved right now, without touching anything
    pub fn plan(&self, path: &Path) -> Option<PathBuf> {
        let rules = self.rules.load();
        if !rules.is_enabled() {
            return None;
        }
        let rule = rules.lookup_path(path)?;
        let file_name = Path::new(path.file_name()?);
        unique_destination(&self.root.join(&rule.folder_name), file_name).ok()
    }

    /// Sort the files already sitting in the root, one at a time
    pub async fn sort_existing(&self) -> Result<usize> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to scan {}", self.root.display()))?;

        let mut scanned = 0;
        let mut moved = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            scanned += 1;
            if let Outcome::Moved { .. } = self.on_file_event(&FileEvent::created(path)).await {
                moved += 1;
            }
        }

        info!(
            "Scan of {}: {} files scanned, {} moved",
            self.root.display(),
            scanned,
            moved
        );
        Ok(moved)
    }

    /// Handle events from `source` until it ends or `shutdown` resolves.
    ///
    /// Each event gets its own task, at most `max_concurrent_moves` at a
    /// time; the grace wait of one file never delays pulling the next
    /// event. When the source ends, in-flight handlers are awaited. On
    /// shutdown they get `shutdown_timeout` to finish and are then aborted.
    pub async fn run<S, F>(&self, mut source: S, shutdown: F)
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrent_moves.max(1)));
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        info!("Sort engine started on {}", self.root.display());

        let interrupted = loop {
            tokio::select! {
                _ = &mut shutdown => break true,
                next = source.next_event() => {
                    let Some(event) = next else { break false };

                    let engine = self.clone();
                    let permits = Arc::clone(&permits);
                    tasks.spawn(async move {
                        let Ok(_permit) = permits.acquire_owned().await else {
                            return;
                        };
                        engine.on_file_event(&event).await;
                    });
                }
            }

            while let Some(res) = tasks.try_join_next() {
                log_task_result(res);
            }
        };

        if interrupted {
            info!("Shutting down sort engine");
            let drain = async {
                while let Some(res) = tasks.join_next().await {
                    log_task_result(res);
                }
            };
            let drained = tokio::time::timeout(self.options.shutdown_timeout, drain)
                .await
                .is_ok();
            if !drained {
                warn!("Abandoning {} in-flight events", tasks.len());
                tasks.abort_all();
            }
        } else {
            debug!("Event source closed");
            while let Some(res) = tasks.join_next().await {
                log_task_result(res);
            }
        }

        info!(
            "Sort engine stopped ({} files sorted)",
            self.files_sorted()
        );
    }
}

fn log_task_result(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res
        && e.is_panic()
    {
        error!("Event handler panicked: {}", e);
    }
}

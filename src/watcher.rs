//! File system watcher feeding change events to the tree
//!
//! Raw notify events are collected into a dirty set. The first event of a
//! burst schedules a flush after the debounce window; the flush maps the
//! dirty set to the directories whose listings changed and sends one change
//! per directory.

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::entry::Entry;
use crate::error::WatchError;
use crate::local::url_for;
use crate::tree::{ChangeEvent, DirectoryTree, PropagationOutcome};

/// Keeps the underlying watcher alive
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ChangeWatcher {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Watch `root` recursively. Must be called from inside a tokio runtime.
pub fn start_watching(
    root: &Path,
    debounce: Duration,
    sender: UnboundedSender<ChangeEvent>,
) -> Result<ChangeWatcher, WatchError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

    let dirty_paths: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));
    let scheduled = Arc::new(AtomicBool::new(false));
    let watch_root = root.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("[Watch] Watcher error: {}", e);
                    return;
                }
            };
            dirty_paths.lock().extend(event.paths);

            if !scheduled.swap(true, Ordering::Relaxed) {
                let dirty_paths = dirty_paths.clone();
                let scheduled = scheduled.clone();
                let sender = sender.clone();
                let root = watch_root.clone();
                handle.spawn(async move {
                    tokio::time::sleep(debounce).await;
                    scheduled.store(false, Ordering::Relaxed);
                    let dirty = std::mem::take(&mut *dirty_paths.lock());
                    let dirs = coalesce_dirty_dirs(dirty, &root);
                    tracing::debug!("[Watch] Flushing {} dirty directories", dirs.len());
                    for dir in dirs {
                        let event = ChangeEvent::DirectoryChanged {
                            entry: Entry::directory(url_for(&dir)),
                        };
                        if sender.send(event).is_err() {
                            tracing::debug!("[Watch] Receiver dropped, stopping");
                            break;
                        }
                    }
                });
            }
        },
        Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    tracing::info!("[Watch] Watching {:?}", root);

    Ok(ChangeWatcher {
        _watcher: watcher,
        root: root.to_path_buf(),
    })
}

/// Reduce dirty paths to the directories whose listings changed.
///
/// A created, removed or renamed path changes its parent's listing, so every
/// path maps to its parent; the watched root maps to itself. Tree refreshes
/// are not recursive, so a dirty directory nested in another one is kept.
pub fn coalesce_dirty_dirs(dirty_paths: HashSet<PathBuf>, root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = dirty_paths
        .into_iter()
        .filter(|path| path.starts_with(root))
        .map(|path| match path.parent() {
            Some(parent) if parent.starts_with(root) => parent.to_path_buf(),
            _ => path,
        })
        .collect();

    dirs.sort();
    dirs.dedup();
    dirs
}

/// Apply change events to `tree` until the sender side is dropped.
pub async fn pump_changes(tree: Arc<DirectoryTree>, mut events: UnboundedReceiver<ChangeEvent>) {
    while let Some(event) = events.recv().await {
        for outcome in tree.handle_change(event).await {
            match outcome {
                PropagationOutcome::Refreshed { entry } => {
                    tracing::trace!("[Watch] Refreshed {}", entry.url())
                }
                PropagationOutcome::NotShown { entry } => {
                    tracing::trace!("[Watch] {} is not shown, nothing to refresh", entry.url())
                }
                PropagationOutcome::VolumeFallback { volume_id } => {
                    tracing::debug!("[Watch] Fell back to refreshing volume {}", volume_id)
                }
                PropagationOutcome::Dropped => tracing::trace!("[Watch] Change dropped"),
            }
        }
    }
}

//! The set of directories currently subscribed to notifications.
//!
//! Subscriptions are non-recursive, one per directory, so the set follows the
//! directory topology of the source tree as it changes. It is also the only
//! memory of which deleted paths used to be directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};

use super::error::WatchError;

/// Subscription side effect behind the watch set.
pub trait WatchBackend {
    fn subscribe(&mut self, dir: &Path) -> Result<(), WatchError>;
    fn unsubscribe(&mut self, dir: &Path) -> Result<(), WatchError>;
}

impl WatchBackend for notify::RecommendedWatcher {
    fn subscribe(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn unsubscribe(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.unwatch(dir).map_err(WatchError::from)
    }
}

/// Directories under subscription.
#[derive(Debug)]
pub struct WatchSet<B> {
    backend: B,
    dirs: HashSet<PathBuf>,
}

impl<B: WatchBackend> WatchSet<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            dirs: HashSet::new(),
        }
    }

    /// Subscribe to `dir` and record it.
    ///
    /// Returns `Ok(false)` when the directory was already recorded. On error
    /// nothing is recorded and the directory stays unmonitored.
    pub fn add(&mut self, dir: &Path) -> Result<bool, WatchError> {
        if self.dirs.contains(dir) {
            return Ok(false);
        }

        crate::log_event!("watcher", "watch", "{}", dir.display());
        self.backend.subscribe(dir)?;
        self.dirs.insert(dir.to_path_buf());
        Ok(true)
    }

    /// Forget `dir`. Unsubscribing is best effort: the OS usually dropped the
    /// watch already when the directory went away.
    pub fn remove(&mut self, dir: &Path) -> bool {
        if !self.dirs.remove(dir) {
            return false;
        }

        crate::log_event!("watcher", "unwatch", "{}", dir.display());
        if let Err(e) = self.backend.unsubscribe(dir) {
            crate::debug_event!("watcher", "unwatch ignored", "{e}");
        }
        true
    }

    /// Forget `dir` and every recorded directory below it.
    pub fn remove_tree(&mut self, dir: &Path) -> usize {
        let mut doomed: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(dir))
            .cloned()
            .collect();
        // Deepest first, mirroring the order the OS reports removals in
        doomed.sort_by(|a, b| b.components().count().cmp(&a.components().count()));

        doomed.iter().filter(|d| self.remove(d)).count()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// All recorded directories.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

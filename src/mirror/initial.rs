//! One-shot mirror of a source tree.
//!
//! Each directory is put under watch before its contents are read, so an
//! entry created while the walk is running is either seen by the walk or
//! reported by the watcher.

use std::fmt;
use std::path::Path;

use walkdir::WalkDir;

use crate::context::MirrorContext;
use crate::watcher::{WatchBackend, WatchSet};

use super::classify::lowercase_extension;
use super::ops;

/// Counters from one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub dirs: usize,
    pub copied: usize,
    /// Tracked documents left out of the mirror.
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} directories, {} files copied, {} documents skipped, {} errors",
            self.dirs, self.copied, self.skipped, self.errors
        )
    }
}

/// Mirror the whole source root into the output root.
pub fn sync<B: WatchBackend>(ctx: &MirrorContext, watch_set: &mut WatchSet<B>) -> SyncStats {
    sync_tree(ctx, watch_set, ctx.source_root())
}

/// Mirror the source subtree rooted at `root`, which must lie inside the source root.
///
/// Errors on single entries are logged and counted; the walk always runs to the end.
pub fn sync_tree<B: WatchBackend>(
    ctx: &MirrorContext,
    watch_set: &mut WatchSet<B>,
    root: &Path,
) -> SyncStats {
    let mut stats = SyncStats::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("[mirror] walk error: {e}");
                stats.errors += 1;
                continue;
            }
        };

        let path = entry.path();
        let relative = match path.strip_prefix(ctx.source_root()) {
            Ok(rel) => rel,
            Err(_) => {
                tracing::warn!("[mirror] {} is outside the source root", path.display());
                stats.errors += 1;
                continue;
            }
        };
        let target = ctx.output_path(relative);

        if entry.file_type().is_dir() {
            stats.dirs += 1;
            if let Err(e) = watch_set.add(path) {
                tracing::warn!("[watcher] {e}");
                stats.errors += 1;
            }
            // The output root itself already exists
            if relative.as_os_str().is_empty() {
                continue;
            }
            if let Err(e) = ops::mk_dir_like(path, &target) {
                tracing::warn!("[mirror] {e}");
                stats.errors += 1;
            }
            continue;
        }

        if ctx.extensions().contains(&lowercase_extension(path)) {
            crate::debug_event!("mirror", "skip document", "{}", relative.display());
            stats.skipped += 1;
            continue;
        }

        match ops::copy_file(path, &target) {
            Ok(()) => stats.copied += 1,
            Err(e) => {
                tracing::warn!("[mirror] {e}");
                stats.errors += 1;
            }
        }
    }

    stats
}

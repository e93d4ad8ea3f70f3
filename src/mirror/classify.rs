//! Path classification for incoming events.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::context::MirrorContext;

/// What the mirror knows about one path at the moment an event is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub absolute_path: PathBuf,
    /// Path relative to the source root.
    pub relative_path: PathBuf,
    /// Lowercase extension including the dot, empty when there is none.
    pub extension: String,
    pub is_dir: bool,
    /// Whether the path could be stat'ed when classified.
    pub exists: bool,
    /// Compiled document rather than a verbatim copy.
    pub tracked: bool,
}

/// Lowercase extension of `path` with its leading dot (`"a/B.ADOC"` -> `".adoc"`).
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Classify `path` against the context.
///
/// When the path can no longer be stat'ed, `was_dir` decides whether it was
/// a directory; the watch set is the only record left at that point.
pub fn classify(
    ctx: &MirrorContext,
    path: &Path,
    was_dir: impl FnOnce(&Path) -> bool,
) -> PathInfo {
    let (exists, is_dir) = match fs::metadata(path) {
        Ok(meta) => (true, meta.is_dir()),
        Err(_) => (false, was_dir(path)),
    };

    let extension = lowercase_extension(path);
    let tracked = !is_dir && ctx.extensions().contains(&extension);

    PathInfo {
        absolute_path: path.to_path_buf(),
        relative_path: relative_to(ctx.source_root(), path),
        extension,
        is_dir,
        exists,
        tracked,
    }
}

/// Strip `root` from `path`. Paths outside the root lose their prefix and
/// parent components instead, so joining the result never escapes the output root.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect(),
    }
}

//! Immutable process-wide state: the two roots, the tracked extensions and
//! the resolved entry file.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Settings;
use crate::watcher::WatchError;

/// Fatal errors raised before the event loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("{} is not a valid directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Unable to find a default index file ({})", tested.join(", "))]
    NoEntryFile { tested: Vec<String> },

    #[error(
        "Output directory {} must not be inside the watched directory {}",
        output.display(),
        source_root.display()
    )]
    OutputInsideSource { source_root: PathBuf, output: PathBuf },

    #[error("No tracked extensions configured")]
    NoTrackedExtensions,

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

/// Ordered set of extensions denoting compiled documents.
///
/// Stored lowercase with a leading dot, in entry-file priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedExtensions(Vec<String>);

impl TrackedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().to_lowercase();
            if ext.is_empty() || ext == "." {
                continue;
            }
            let ext = if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            };
            if !list.contains(&ext) {
                list.push(ext);
            }
        }
        Self(list)
    }

    /// `ext` is expected lowercase with its dot, as produced by the classifier.
    pub fn contains(&self, ext: &str) -> bool {
        self.0.iter().any(|e| e == ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TrackedExtensions {
    fn default() -> Self {
        Self::new([".asciidoc", ".adoc", ".asc"])
    }
}

/// Everything the mirror needs to know that never changes after startup.
#[derive(Debug, Clone)]
pub struct MirrorContext {
    source_root: PathBuf,
    output_root: PathBuf,
    extensions: TrackedExtensions,
    entry_file: String,
}

impl MirrorContext {
    /// Validate both roots and resolve the entry file.
    pub fn new(
        source: &Path,
        output: &Path,
        extensions: TrackedExtensions,
        entry_stem: &str,
    ) -> Result<Self, StartupError> {
        if extensions.is_empty() {
            return Err(StartupError::NoTrackedExtensions);
        }

        let source_root = ensure_directory(source)?;
        let output_root = ensure_directory(output)?;

        if output_root.starts_with(&source_root) {
            return Err(StartupError::OutputInsideSource {
                source_root,
                output: output_root,
            });
        }

        let entry_file = find_entry_file(&source_root, &extensions, entry_stem)?;

        Ok(Self {
            source_root,
            output_root,
            extensions,
            entry_file,
        })
    }

    /// Build a context from loaded settings.
    pub fn from_settings(
        source: &Path,
        output: &Path,
        settings: &Settings,
    ) -> Result<Self, StartupError> {
        Self::new(
            source,
            output,
            TrackedExtensions::new(&settings.tracked_extensions),
            &settings.entry_stem,
        )
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn extensions(&self) -> &TrackedExtensions {
        &self.extensions
    }

    /// File name of the build entry point, relative to the source root.
    pub fn entry_file(&self) -> &str {
        &self.entry_file
    }

    /// Map a relative path onto the output tree.
    pub fn output_path(&self, relative: &Path) -> PathBuf {
        if relative.as_os_str().is_empty() {
            self.output_root.clone()
        } else {
            self.output_root.join(relative)
        }
    }
}

/// Canonicalize `path` and require it to be an existing directory.
pub fn ensure_directory(path: &Path) -> Result<PathBuf, StartupError> {
    let not_a_dir = || StartupError::NotADirectory {
        path: path.to_path_buf(),
    };

    let canonical = path.canonicalize().map_err(|_| not_a_dir())?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(not_a_dir())
    }
}

/// Look in `source_root` for `<stem><ext>` in extension priority order.
pub fn find_entry_file(
    source_root: &Path,
    extensions: &TrackedExtensions,
    stem: &str,
) -> Result<String, StartupError> {
    let mut tested = Vec::new();

    for ext in extensions.iter() {
        let candidate = format!("{stem}{ext}");
        if source_root.join(&candidate).is_file() {
            return Ok(candidate);
        }
        tested.push(candidate);
    }

    Err(StartupError::NoEntryFile { tested })
}

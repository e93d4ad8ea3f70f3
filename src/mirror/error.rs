//! Error types for mirror operations.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from a single mirror primitive.
///
/// These never stop the watch loop: the affected path stays stale until
/// a later event touches it again.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("non-regular source file {}", path.display())]
    NonRegularSource { path: PathBuf },

    #[error("non-regular destination file {}", path.display())]
    NonRegularDestination { path: PathBuf },
}

impl MirrorError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        MirrorError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;

//! Keep an output directory in sync with a document tree and rebuild
//! generated output whenever a source changes.
//!
//! Startup mirrors the whole source tree (tracked documents excluded) while
//! putting every directory under watch; afterwards each filesystem event is
//! classified, routed to idempotent mirror operations and, for file changes,
//! followed by a run of the external compiler.

pub mod cli;
pub mod config;
pub mod context;
pub mod logging;
pub mod mirror;
pub mod rebuild;
pub mod watcher;

pub use config::Settings;
pub use context::{MirrorContext, StartupError, TrackedExtensions};
pub use mirror::{MirrorError, PathInfo, SyncStats};
pub use rebuild::{CompilerCommand, RebuildError, RebuildOutcome, Rebuilder};
pub use watcher::{
    Dispatcher, FsEvent, MirrorCommand, Op, WatchBackend, WatchError, WatchSet, run_watch,
};

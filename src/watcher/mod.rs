//! Live watching of the source tree.
//!
//! This module turns filesystem notifications into mirror updates and rebuilds.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (one non-recursive watch per directory)
//!         |
//!     FsEvent { path, op, dir_hint }
//!         |
//!     Dispatcher
//!       - classify (watch set answers for deleted paths)
//!       - plan     (pure routing table)
//!       - execute  (mirror ops, watch set, Rebuilder)
//! ```

mod debouncer;
mod dispatcher;
mod error;
mod event;
mod runner;
mod watch_set;

pub use debouncer::Debouncer;
pub use dispatcher::{MirrorCommand, plan};
pub use error::WatchError;
pub use event::{FsEvent, Op};
pub use runner::{Dispatcher, run_watch};
pub use watch_set::{WatchBackend, WatchSet};

#[cfg(test)]
pub(crate) use watch_set::testing;

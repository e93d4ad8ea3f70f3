//! Mirroring of the source tree into the output tree.
//!
//! - [`classify`] decides what a path is
//! - [`ops`] holds the idempotent copy/remove primitives
//! - [`sync`] performs the initial full mirror

mod classify;
mod error;
mod initial;
pub mod ops;

pub use classify::{PathInfo, classify, lowercase_extension};
pub use error::{MirrorError, MirrorResult};
pub use initial::{SyncStats, sync, sync_tree};

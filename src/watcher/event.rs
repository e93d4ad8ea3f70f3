//! Notification events as the dispatcher sees them.
//!
//! `notify` reports one event kind for possibly several paths. The dispatcher
//! wants one path with a set of operation flags, so every notify event is
//! split into one [`FsEvent`] per path.

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};

bitflags! {
    /// Operations carried by a single event. Several may be set at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Op: u8 {
        const CREATE = 1 << 0;
        const REMOVE = 1 << 1;
        const WRITE = 1 << 2;
        const RENAME = 1 << 3;
        const CHMOD = 1 << 4;
    }
}

impl Op {
    /// Translate a notify event kind. Access and unknown notifications map to no op.
    pub fn from_kind(kind: &EventKind) -> Op {
        match kind {
            EventKind::Create(_) => Op::CREATE,
            EventKind::Remove(_) => Op::REMOVE,
            EventKind::Modify(ModifyKind::Metadata(_)) => Op::CHMOD,
            EventKind::Modify(ModifyKind::Name(_)) => Op::RENAME,
            EventKind::Modify(_) => Op::WRITE,
            EventKind::Any => Op::WRITE,
            EventKind::Access(_) | EventKind::Other => Op::empty(),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Op, &str); 5] = [
            (Op::CREATE, "CREATE"),
            (Op::REMOVE, "REMOVE"),
            (Op::WRITE, "WRITE"),
            (Op::RENAME, "RENAME"),
            (Op::CHMOD, "CHMOD"),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

/// One path and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: Op,
    /// The backend reported the path as a directory.
    ///
    /// Used when the path is already gone: a directory removal is reported
    /// once by the parent's watch and once by the directory's own.
    pub dir_hint: bool,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
            dir_hint: false,
        }
    }

    /// Mark the event as concerning a directory.
    pub fn as_dir(mut self) -> Self {
        self.dir_hint = true;
        self
    }

    /// Split a notify event into per-path events.
    ///
    /// Renames are handled from their `From` and `To` halves; the combined
    /// `Both` event that follows them is dropped. The dispatcher tells the
    /// old path from the new one by checking which exists.
    pub fn from_notify(event: notify::Event) -> Vec<FsEvent> {
        if matches!(event.kind, EventKind::Modify(ModifyKind::Name(RenameMode::Both))) {
            return Vec::new();
        }

        let op = Op::from_kind(&event.kind);
        if op.is_empty() {
            return Vec::new();
        }

        let dir_hint = matches!(
            event.kind,
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
        );

        event
            .paths
            .into_iter()
            .map(|path| FsEvent { path, op, dir_hint })
            .collect()
    }

    /// Empty, `.` and `..` paths carry no usable location.
    pub fn is_well_formed(&self) -> bool {
        !is_degenerate(&self.path)
    }
}

fn is_degenerate(path: &Path) -> bool {
    let raw = path.as_os_str();
    raw.is_empty() || raw == "." || raw == ".."
}

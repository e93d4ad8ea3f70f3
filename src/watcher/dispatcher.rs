//! Routing of classified events to mirror commands.
//!
//! [`plan`] is a pure function: given what is known about a path and which
//! operations an event carries, it lists the side effects to perform, in order.
//! Nothing here touches the filesystem or the watch set.

use std::path::{Path, PathBuf};

use crate::mirror::PathInfo;

use super::event::Op;

/// A single side effect requested by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorCommand {
    /// Add a source directory to the watch set.
    Watch(PathBuf),
    /// Drop a source directory and everything below it from the watch set.
    Unwatch(PathBuf),
    /// Create one output directory with the mode of its source directory.
    MakeDir { src: PathBuf, dst: PathBuf },
    /// Delete an output subtree.
    RemoveTree(PathBuf),
    CopyFile { src: PathBuf, dst: PathBuf },
    RemoveFile(PathBuf),
    /// Watch, create and fill a whole source subtree that appeared at once.
    MirrorTree(PathBuf),
    Rebuild,
}

/// Plan the commands for one event.
///
/// Flags are handled in the order create, remove, write, rename, chmod and
/// every matching flag contributes. Structural directory changes end the plan:
/// the watch set must be up to date before any nested event is classified, and
/// the nested file events bring their own rebuilds.
pub fn plan(info: &PathInfo, target: &Path, op: Op) -> Vec<MirrorCommand> {
    let mut commands = Vec::new();
    let src = &info.absolute_path;

    if op.contains(Op::CREATE) {
        if info.is_dir {
            commands.push(MirrorCommand::Watch(src.clone()));
            commands.push(MirrorCommand::MakeDir {
                src: src.clone(),
                dst: target.to_path_buf(),
            });
            return commands;
        }
        file_changed(info, target, &mut commands);
    }

    if op.contains(Op::REMOVE) {
        if info.is_dir {
            commands.push(MirrorCommand::Unwatch(src.clone()));
            commands.push(MirrorCommand::RemoveTree(target.to_path_buf()));
            return commands;
        }
        file_removed(info, target, &mut commands);
    }

    if op.contains(Op::WRITE) && !info.is_dir {
        file_changed(info, target, &mut commands);
    }

    if op.contains(Op::RENAME) {
        // Nothing below a renamed directory reports on its own, so directory
        // renames mirror or drop the whole subtree and rebuild.
        match (info.exists, info.is_dir) {
            (true, true) => {
                commands.push(MirrorCommand::MirrorTree(src.clone()));
                commands.push(MirrorCommand::Rebuild);
                return commands;
            }
            (false, true) => {
                commands.push(MirrorCommand::Unwatch(src.clone()));
                commands.push(MirrorCommand::RemoveTree(target.to_path_buf()));
                commands.push(MirrorCommand::Rebuild);
                return commands;
            }
            (true, false) => file_changed(info, target, &mut commands),
            (false, false) => file_removed(info, target, &mut commands),
        }
    }

    if op.contains(Op::CHMOD) && !info.is_dir {
        file_changed(info, target, &mut commands);
    }

    commands
}

fn file_changed(info: &PathInfo, target: &Path, commands: &mut Vec<MirrorCommand>) {
    if !info.tracked {
        commands.push(MirrorCommand::CopyFile {
            src: info.absolute_path.clone(),
            dst: target.to_path_buf(),
        });
    }
    commands.push(MirrorCommand::Rebuild);
}

fn file_removed(info: &PathInfo, target: &Path, commands: &mut Vec<MirrorCommand>) {
    if !info.tracked {
        commands.push(MirrorCommand::RemoveFile(target.to_path_buf()));
    }
    commands.push(MirrorCommand::Rebuild);
}

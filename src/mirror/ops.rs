//! Idempotent filesystem primitives used to keep the output tree in sync.
//!
//! Every primitive logs what it is about to do before doing it and can be
//! repeated safely: copying onto an up-to-date file rewrites it, removing
//! something that is already gone is a no-op.

use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind};
use std::path::Path;

use walkdir::WalkDir;

use super::error::{MirrorError, MirrorResult};

/// Copy `src` over `dst`, carrying over the permission bits.
///
/// The content goes to a temporary file next to `dst` that is synced and then
/// renamed into place, so readers see either the old or the new file.
pub fn copy_file(src: &Path, dst: &Path) -> MirrorResult<()> {
    crate::log_event!("mirror", "cp", "{} -> {}", src.display(), dst.display());

    let src_meta = fs::metadata(src).map_err(|e| MirrorError::io("stat", src, e))?;
    if !src_meta.is_file() {
        return Err(MirrorError::NonRegularSource {
            path: src.to_path_buf(),
        });
    }

    match fs::metadata(dst) {
        Ok(dst_meta) => {
            if !dst_meta.is_file() {
                return Err(MirrorError::NonRegularDestination {
                    path: dst.to_path_buf(),
                });
            }
            if same_file(src, &src_meta, dst, &dst_meta) {
                crate::debug_event!("mirror", "same file", "{}", dst.display());
                return Ok(());
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(MirrorError::io("stat", dst, e)),
    }

    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut input = File::open(src).map_err(|e| MirrorError::io("open", src, e))?;
    let mut staged = tempfile::Builder::new()
        .prefix(".docmirror-")
        .tempfile_in(parent)
        .map_err(|e| MirrorError::io("create", dst, e))?;

    io::copy(&mut input, staged.as_file_mut()).map_err(|e| MirrorError::io("copy", dst, e))?;
    staged
        .as_file()
        .set_permissions(src_meta.permissions())
        .map_err(|e| MirrorError::io("chmod", dst, e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| MirrorError::io("fsync", dst, e))?;
    staged
        .persist(dst)
        .map_err(|e| MirrorError::io("rename", dst, e.error))?;

    Ok(())
}

#[cfg(unix)]
fn same_file(_src: &Path, src_meta: &Metadata, _dst: &Path, dst_meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    src_meta.dev() == dst_meta.dev() && src_meta.ino() == dst_meta.ino()
}

#[cfg(not(unix))]
fn same_file(src: &Path, _src_meta: &Metadata, dst: &Path, _dst_meta: &Metadata) -> bool {
    match (src.canonicalize(), dst.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Create a single directory level. An existing directory is fine.
pub fn mk_dir(path: &Path) -> MirrorResult<()> {
    crate::log_event!("mirror", "mkdir", "{}", path.display());

    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(MirrorError::io("mkdir", path, e)),
    }
}

/// Create `dst` and give it the permission bits of the directory `src`.
pub fn mk_dir_like(src: &Path, dst: &Path) -> MirrorResult<()> {
    mk_dir(dst)?;

    let permissions = fs::metadata(src)
        .map_err(|e| MirrorError::io("stat", src, e))?
        .permissions();
    fs::set_permissions(dst, permissions).map_err(|e| MirrorError::io("chmod", dst, e))
}

/// Delete a single file. A missing file is fine.
pub fn remove_file(path: &Path) -> MirrorResult<()> {
    crate::log_event!("mirror", "rm", "{}", path.display());

    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MirrorError::io("rm", path, e)),
    }
}

/// Recursively delete `path`, best effort.
///
/// Entries that cannot be removed are logged and skipped; returns how many
/// entries were left behind.
pub fn remove_tree(path: &Path) -> usize {
    crate::log_event!("mirror", "rm -rf", "{}", path.display());

    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("[mirror] cannot stat {}: {e}", path.display());
            return 1;
        }
    };

    if !meta.is_dir() {
        return match fs::remove_file(path) {
            Ok(()) => 0,
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                tracing::warn!("[mirror] failed to remove {}: {e}", path.display());
                1
            }
        };
    }

    if fs::remove_dir_all(path).is_ok() {
        return 0;
    }

    // Fall back to entry-by-entry removal, children first
    let mut left_behind = 0;
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("[mirror] walk error under {}: {e}", path.display());
                left_behind += 1;
                continue;
            }
        };

        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };

        if let Err(e) = result {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("[mirror] failed to remove {}: {e}", entry.path().display());
                left_behind += 1;
            }
        }
    }

    left_behind
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_creates_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        let dst = temp.path().join("b.txt");

        fs::write(&src, "first").unwrap();
        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "first");

        fs::write(&src, "second, longer").unwrap();
        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "second, longer");

        // Running it again changes nothing and does not fail
        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "second, longer");
    }

    #[test]
    fn test_copy_file_leaves_no_staging_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("in.bin");
        let out = temp.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(&src, vec![7u8; 64 * 1024]).unwrap();

        copy_file(&src, &out.join("in.bin")).unwrap();

        let names: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("in.bin")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_propagates_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("run.sh");
        let dst = temp.path().join("copy.sh");
        fs::write(&src, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o750)).unwrap();

        copy_file(&src, &dst).unwrap();

        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_copy_file_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = copy_file(&temp.path().join("nope"), &temp.path().join("dst")).unwrap_err();
        assert!(matches!(err, MirrorError::Io { op: "stat", .. }));
        assert!(!temp.path().join("dst").exists());
    }

    #[test]
    fn test_copy_file_rejects_directories() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        let file = temp.path().join("file.txt");
        fs::create_dir(&dir).unwrap();
        fs::write(&file, "x").unwrap();

        let err = copy_file(&dir, &temp.path().join("x")).unwrap_err();
        assert!(matches!(err, MirrorError::NonRegularSource { .. }));

        let err = copy_file(&file, &dir).unwrap_err();
        assert!(matches!(err, MirrorError::NonRegularDestination { .. }));
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_same_file_is_noop() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        let link = temp.path().join("hard.txt");
        fs::write(&src, "shared").unwrap();
        fs::hard_link(&src, &link).unwrap();

        copy_file(&src, &link).unwrap();
        copy_file(&src, &src).unwrap();
        assert_eq!(fs::read_to_string(&link).unwrap(), "shared");
    }

    #[test]
    fn test_mk_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sub");

        mk_dir(&dir).unwrap();
        mk_dir(&dir).unwrap();
        assert!(dir.is_dir());

        // Only one level is created
        assert!(mk_dir(&temp.path().join("a/b")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_mk_dir_like_copies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o711)).unwrap();

        mk_dir_like(&src, &dst).unwrap();

        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o711);
    }

    #[test]
    fn test_remove_file_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gone.txt");
        fs::write(&file, "x").unwrap();

        remove_file(&file).unwrap();
        remove_file(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_remove_tree_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/one.txt"), "1").unwrap();
        fs::write(root.join("a/b/c/two.txt"), "2").unwrap();

        assert_eq!(remove_tree(&root), 0);
        assert!(!root.exists());
        assert_eq!(remove_tree(&root), 0);
        assert!(temp.path().exists());
    }

    #[test]
    fn test_remove_tree_on_plain_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert_eq!(remove_tree(&file), 0);
        assert!(!file.exists());
    }
}

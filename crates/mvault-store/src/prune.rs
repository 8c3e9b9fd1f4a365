use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use tracing::debug;

use crate::cancel::Cancellation;
use crate::error::StoreResult;

/// Remove every empty directory below `root`, depth first.
///
/// `root` itself is kept even when it ends up empty. Symbolic links are never
/// followed or removed. Entries that disappear while the walk is running are
/// ignored; any other I/O failure is returned.
pub fn prune_empty_dirs(root: &Path, cancel: &Cancellation) -> StoreResult<()> {
    prune_children(root, cancel)
}

/// Prune every entry of `dir`. A `dir` that is already gone has nothing left
/// to prune.
fn prune_children(dir: &Path, cancel: &Cancellation) -> StoreResult<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        match entry {
            Ok(entry) => prune_dir(&entry.path(), cancel)?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Prune `path` and its descendants, removing `path` if it ends up empty.
fn prune_dir(path: &Path, cancel: &Cancellation) -> StoreResult<()> {
    cancel.check()?;

    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Ok(());
    }

    prune_children(path, cancel)?;

    cancel.check()?;
    if is_empty_dir(path)? {
        match fs::remove_dir(path) {
            Ok(()) => debug!(path = %path.display(), "pruned empty directory"),
            // Lost a race with a writer or another pruner.
            Err(_) if !is_empty_dir(path)? => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn removes_nested_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();

        prune_empty_dirs(dir.path(), &Cancellation::never()).unwrap();

        assert!(dir.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn keeps_dirs_with_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/empty")).unwrap();
        fs::write(dir.path().join("a/b/file"), b"x").unwrap();

        prune_empty_dirs(dir.path(), &Cancellation::never()).unwrap();

        assert!(dir.path().join("a/b/file").exists());
        assert!(!dir.path().join("a/b/empty").exists());
    }

    #[test]
    fn missing_root_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        prune_empty_dirs(&dir.path().join("nope"), &Cancellation::never()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::create_dir(target.path().join("inner")).unwrap();
        std::os::unix::fs::symlink(target.path(), dir.path().join("link")).unwrap();

        prune_empty_dirs(dir.path(), &Cancellation::never()).unwrap();

        assert!(dir.path().join("link").exists());
        assert!(target.path().join("inner").exists());
    }

    #[test]
    fn vanished_directory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        prune_children(&dir.path().join("gone"), &Cancellation::never()).unwrap();
        prune_dir(&dir.path().join("gone/deeper"), &Cancellation::never()).unwrap();
    }

    #[test]
    fn concurrent_pruners_do_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            fs::create_dir_all(dir.path().join(format!("ns{i}/repo/tag"))).unwrap();
        }
        let root = dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let root = root.clone();
                std::thread::spawn(move || prune_empty_dirs(&root, &Cancellation::never()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn cancelled_prune() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let cancel = Cancellation::never();
        cancel.cancel();

        let err = prune_empty_dirs(dir.path(), &cancel).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert!(dir.path().join("a/b").exists());
    }
}

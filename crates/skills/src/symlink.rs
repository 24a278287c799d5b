//! Single-entry symlink primitives: create-or-replace, remove, verify, and a
//! one-generation `.backup` for entries displaced by a link.
//!
//! Link targets are stored verbatim; nothing here canonicalizes paths.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Error, Result};

pub const BACKUP_SUFFIX: &str = ".backup";

/// `<path>.backup`, appended to the file name rather than replacing an
/// extension.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// True when `path` itself is a symlink (dangling links included).
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True when anything, including a dangling symlink, exists at `path`.
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Create a link at `target` pointing to `source`.
///
/// An existing symlink is replaced atomically. Any other existing entry makes
/// this fail with [`Error::AlreadyExists`] unless `backup_existing` is set, in
/// which case it is first moved to [`backup_path`].
pub fn create(source: &Path, target: &Path, backup_existing: bool) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => replace_link(source, target),
        Ok(_) if !backup_existing => Err(Error::AlreadyExists {
            path: target.to_path_buf(),
        }),
        Ok(_) => {
            let backup = create_backup(target)?;
            debug!(target = %target.display(), backup = %backup.display(), "moved existing entry aside");
            Ok(make_link(source, target)?)
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(make_link(source, target)?),
        Err(e) => Err(e.into()),
    }
}

/// Remove the link at `target`. Missing entries are fine; refuses to delete
/// anything that is not a symlink.
pub fn remove(target: &Path) -> Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => Ok(remove_link(target)?),
        Ok(_) => Err(Error::NotASymlink {
            path: target.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Whether `link` is a symlink whose stored target equals `expected` exactly.
pub fn verify(link: &Path, expected: &Path) -> bool {
    if !is_symlink(link) {
        return false;
    }
    fs::read_link(link).is_ok_and(|t| t == expected)
}

/// Stored target of the symlink at `link`.
pub fn read_link(link: &Path) -> Result<PathBuf> {
    if !is_symlink(link) {
        return Err(Error::NotASymlink {
            path: link.to_path_buf(),
        });
    }
    Ok(fs::read_link(link)?)
}

/// Move `path` to its backup sibling. At most one backup generation is kept,
/// so an existing backup makes this fail with [`Error::BackupExists`].
pub fn create_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    if entry_exists(&backup) {
        return Err(Error::BackupExists { path: backup });
    }
    fs::rename(path, &backup)?;
    Ok(backup)
}

/// Move the backup of `path` back into place, removing whatever currently
/// occupies `path`.
pub fn restore_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    fs::symlink_metadata(&backup)?;
    remove_entry(path)?;
    fs::rename(&backup, path)?;
    Ok(())
}

/// Delete the backup of `path` if one exists.
pub fn cleanup_backups(path: &Path) -> Result<()> {
    remove_entry(&backup_path(path))
}

/// Remove whatever is at `path`: link, file, or directory tree. Missing is fine.
pub(crate) fn remove_entry(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Ok(remove_link(path)?),
        Ok(meta) if meta.is_dir() => Ok(fs::remove_dir_all(path)?),
        Ok(_) => Ok(fs::remove_file(path)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn replace_link(source: &Path, target: &Path) -> Result<()> {
    // Build the new link beside the old one, then rename over it so readers
    // see either the old or the new target.
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = target.with_file_name(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
    make_link(source, &tmp)?;
    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(not(unix))]
fn replace_link(source: &Path, target: &Path) -> Result<()> {
    remove_link(target)?;
    Ok(make_link(source, target)?)
}

#[cfg(unix)]
fn make_link(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn make_link(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(unix)]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
    // Directory symlinks on Windows must be removed as directories.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("repo/skills/teach");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("home/.claude/skills/teach");
        (tmp, source, target)
    }

    #[test]
    fn create_makes_parent_and_link() {
        let (_tmp, source, target) = setup();
        create(&source, &target, false).unwrap();
        assert!(is_symlink(&target));
        assert_eq!(read_link(&target).unwrap(), source);
        assert!(verify(&target, &source));
    }

    #[test]
    fn create_replaces_existing_symlink() {
        let (tmp, source, target) = setup();
        let other = tmp.path().join("other");
        fs::create_dir_all(&other).unwrap();

        create(&other, &target, false).unwrap();
        create(&source, &target, false).unwrap();

        assert_eq!(read_link(&target).unwrap(), source);
        // No temp links left behind.
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn create_stores_target_verbatim() {
        let (_tmp, _source, target) = setup();
        let relative = Path::new("../../repo/skills/teach");
        create(relative, &target, false).unwrap();
        assert_eq!(read_link(&target).unwrap(), relative);
    }

    #[test]
    fn create_refuses_regular_file_without_backup() {
        let (_tmp, source, target) = setup();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"hand written").unwrap();

        let err = create(&source, &target, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"hand written");
        assert!(!entry_exists(&backup_path(&target)));
    }

    #[test]
    fn create_with_backup_preserves_original_bytes() {
        let (_tmp, source, target) = setup();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"hand written").unwrap();

        create(&source, &target, true).unwrap();
        assert!(verify(&target, &source));
        assert_eq!(fs::read(backup_path(&target)).unwrap(), b"hand written");
    }

    #[test]
    fn create_with_backup_never_overwrites_existing_backup() {
        let (_tmp, source, target) = setup();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"second").unwrap();
        fs::write(backup_path(&target), b"first").unwrap();

        let err = create(&source, &target, true).unwrap_err();
        assert!(matches!(err, Error::BackupExists { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert_eq!(fs::read(backup_path(&target)).unwrap(), b"first");
    }

    #[test]
    fn remove_is_idempotent_and_protects_files() {
        let (_tmp, source, target) = setup();
        remove(&target).unwrap();

        create(&source, &target, false).unwrap();
        remove(&target).unwrap();
        assert!(!entry_exists(&target));
        assert!(source.is_dir());

        fs::write(&target, b"data").unwrap();
        assert!(matches!(remove(&target), Err(Error::NotASymlink { .. })));
        assert!(target.is_file());
    }

    #[test]
    fn verify_is_false_for_missing_or_plain_entries() {
        let (_tmp, source, target) = setup();
        assert!(!verify(&target, &source));
        fs::create_dir_all(&target).unwrap();
        assert!(!verify(&target, &source));
    }

    #[test]
    fn verify_requires_exact_target() {
        let (_tmp, source, target) = setup();
        create(&source, &target, false).unwrap();
        let equivalent = source.parent().unwrap().join("../skills/teach");
        assert!(!verify(&target, &equivalent));
    }

    #[test]
    fn dangling_link_is_still_a_symlink() {
        let (tmp, _source, target) = setup();
        create(&tmp.path().join("gone"), &target, false).unwrap();
        assert!(is_symlink(&target));
        remove(&target).unwrap();
        assert!(!entry_exists(&target));
    }

    #[test]
    fn backup_restore_and_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.md");
        fs::write(&path, b"v1").unwrap();

        let backup = create_backup(&path).unwrap();
        assert_eq!(backup, tmp.path().join("notes.md.backup"));
        fs::write(&path, b"v2").unwrap();

        restore_backup(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"v1");
        assert!(!entry_exists(&backup));

        cleanup_backups(&path).unwrap();
        create_backup(&path).unwrap();
        cleanup_backups(&path).unwrap();
        cleanup_backups(&path).unwrap();
        assert!(!entry_exists(&backup));
    }

    #[test]
    fn restore_without_backup_fails_and_keeps_current() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.md");
        fs::write(&path, b"current").unwrap();
        assert!(restore_backup(&path).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"current");
    }
}

//! Capability-set filesystem abstraction.
//!
//! Filesystem access is modeled as a capability set (`stat`, `readdir`,
//! `read_to_string`, optional `readlink`) rather than an inheritance
//! hierarchy, so a caller can feature-detect the optional symlink capability
//! instead of requiring every implementor to support it.

use crate::error::KthuluError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Directory entry kind, as reported by [`FsCapability::readdir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Minimal filesystem capability set consumed by the scanner and layer
/// analyzer. `readlink` is optional — implementations that can't resolve
/// symlinks simply report `None` and callers treat the entry as opaque.
pub trait FsCapability {
    fn stat_is_dir(&self, path: &Path) -> io::Result<bool>;
    fn readdir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn readlink(&self, _path: &Path) -> Option<PathBuf> {
        None
    }
}

/// The standard-library backed implementation used by the CLI and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl FsCapability for StdFs {
    fn stat_is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.is_dir())
    }

    fn readdir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            out.push(DirEntry { path: entry.path(), kind });
        }
        Ok(out)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn readlink(&self, path: &Path) -> Option<PathBuf> {
        fs::read_link(path).ok()
    }
}

/// Writes `contents` to `path` atomically: write to a sibling temp file, then
/// rename over the destination. A crash between the write and the rename
/// leaves the previous valid file (or no file) in place — never a partial one.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), KthuluError> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| KthuluError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = sibling_tmp_path(path);
    {
        let mut tmp_file = File::create(&tmp_path).map_err(|source| KthuluError::WriteFailed {
            path: tmp_path.clone(),
            source,
        })?;
        tmp_file.write_all(contents).map_err(|source| KthuluError::WriteFailed {
            path: tmp_path.clone(),
            source,
        })?;
        tmp_file.sync_all().map_err(|source| KthuluError::WriteFailed {
            path: tmp_path.clone(),
            source,
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|source| KthuluError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Like [`atomic_write`] but aborts before the rename, simulating a crash
/// mid-write. Used by tests to prove the previous valid file survives a
/// failed write. Never call this outside tests.
#[doc(hidden)]
pub fn atomic_write_aborted(path: &Path, contents: &[u8]) -> Result<(), KthuluError> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = sibling_tmp_path(path);
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents)?;
    tmp_file.sync_all()?;
    // Deliberately skip the rename.
    Ok(())
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "kthulu".to_string());
    let tmp_name = format!(".{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

//! Disk-backed [`FileAccess`] with atomic writes.
//!
//! ## `write` protocol
//!
//! 1. Write content to `<path>.keysync.tmp` (same directory, same filesystem).
//! 2. Rename over the final path (atomic on POSIX).
//! 3. On rename failure, remove the tmp file and leave the original intact.
//!
//! A watcher therefore only ever observes the old or the new content, never a
//! half-written file.

use std::path::{Path, PathBuf};

use crate::collab::FileAccess;
use crate::error::{io_err, FileAccessError};

/// [`FileAccess`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileAccess;

impl DiskFileAccess {
    pub fn new() -> Self {
        Self
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.keysync.tmp", path.display()))
}

fn write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), FileAccessError> {
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

impl FileAccess for DiskFileAccess {
    fn read(&self, path: &Path) -> Result<String, FileAccessError> {
        std::fs::read_to_string(path).map_err(|e| io_err(path, e))
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), FileAccessError> {
        write_with_tmp(path, content, &tmp_path_for(path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<(), FileAccessError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

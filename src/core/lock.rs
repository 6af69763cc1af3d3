//! core::lock
//!
//! Exclusive per-cache lock.
//!
//! # Design
//!
//! One operation owns a project's cache directory at a time. The lock is
//! advisory, OS-level (via `fs2`), non-blocking, and released on drop,
//! so a crashed process never leaves a stale lock behind.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use super::errors::ErrorKind;


/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another envault process holds the lock for this cache.
    #[error("cache is locked by another envault process")]
    AlreadyLocked,

    #[error("failed to create lock file: {0}")]
    CreateFailed(String),

    #[error("lock i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::AlreadyLocked => ErrorKind::Cancelled,
            _ => ErrorKind::Unknown,
        }
    }
}

/// An exclusive lock on one project cache.
///
/// Released automatically when dropped.
#[derive(Debug)]
pub struct CacheLock {
    file: fs::File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the lock for the cache rooted at `cache_dir`.
    ///
    /// The lock file lives next to the cache directory
    /// (`<owner>/<name>.lock`), never inside the working tree.
    /// Non-blocking: fails immediately with [`LockError::AlreadyLocked`]
    /// if another process holds it.
    pub fn acquire(cache_dir: &Path) -> Result<Self, LockError> {
        let parent = cache_dir.parent().unwrap_or(cache_dir);
        fs::create_dir_all(parent).map_err(|e| LockError::CreateFailed(e.to_string()))?;

        let name = cache_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        let path = parent.join(format!("{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(e.to_string()))?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                LockError::AlreadyLocked
            } else {
                LockError::Io(e)
            }
        })?;

        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let lock = CacheLock::acquire(dir.path()).unwrap();
        assert!(lock.path().exists());
        drop(lock);

        // Re-acquirable after release
        let again = CacheLock::acquire(dir.path());
        assert!(again.is_ok());
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let _held = CacheLock::acquire(dir.path()).unwrap();

        let second = CacheLock::acquire(dir.path());
        assert!(matches!(second, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("owner").join("name");
        let lock = CacheLock::acquire(&nested).unwrap();
        assert!(dir.path().join("owner").exists());
        drop(lock);
    }

    #[test]
    fn lock_file_is_outside_the_cache_dir() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("owner").join("name");
        let lock = CacheLock::acquire(&cache_dir).unwrap();
        assert_eq!(lock.path(), dir.path().join("owner").join("name.lock"));
        assert!(!lock.path().starts_with(&cache_dir));
    }
}

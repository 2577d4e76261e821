//! Session lock for one asset type
//!
//! Advisory exclusive lock via fd-lock, held for the lifetime of the value.

use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ResumeError;
use crate::AssetType;

/// Exclusive lock on `<dir>/<type>.lock`
pub struct SessionLock {
    // Dropping the file closes the descriptor, which releases the lock
    _lock: RwLock<File>,
    path: PathBuf,
}

impl SessionLock {
    /// Lock file location for `asset_type` under `dir`
    pub fn path_for(dir: &Path, asset_type: AssetType) -> PathBuf {
        dir.join(format!("{}.lock", asset_type.key()))
    }

    /// Try to take the lock without blocking
    ///
    /// # Errors
    /// Returns [`ResumeError::Lock`] immediately when another session holds it.
    pub fn try_acquire(dir: &Path, asset_type: AssetType) -> Result<Self, ResumeError> {
        std::fs::create_dir_all(dir).map_err(|e| ResumeError::Io(e.to_string()))?;

        let path = Self::path_for(dir, asset_type);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| ResumeError::Lock(format!("Failed to open lock file: {e}")))?;

        let mut lock = RwLock::new(file);
        match lock.try_write() {
            // The guard borrows the lock; forgetting it keeps the OS lock held
            // until the descriptor is closed on drop
            Ok(guard) => std::mem::forget(guard),
            Err(e) => {
                return Err(ResumeError::Lock(format!(
                    "another session for {asset_type} holds {}: {e}",
                    path.display()
                )))
            }
        }

        debug!(path = %path.display(), "Session lock acquired");
        Ok(Self { _lock: lock, path })
    }

    /// Lock file location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

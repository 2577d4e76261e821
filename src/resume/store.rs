//! Checkpoint store
//!
//! Checkpoints are addressed solely by asset type and written atomically:
//! serialize, write a temp file in the same directory, fsync, rename over the
//! target, fsync the directory. A crash mid-save leaves the previous
//! checkpoint intact.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Checkpoint, ResumeError};
use crate::downloader::AssetDownloader;
use crate::fetcher::Fetch;
use crate::registry::DownloaderRegistry;
use crate::AssetType;

/// Largest checkpoint file accepted on load (512 MiB)
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Directory of per-asset-type checkpoint files
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Checkpoint file for `asset_type`
    pub fn path(&self, asset_type: AssetType) -> PathBuf {
        self.dir.join(format!("{}.checkpoint.json", asset_type.key()))
    }

    /// Persist the full state of `downloader`
    ///
    /// Returns the checkpoint path.
    pub fn save(&self, downloader: &dyn AssetDownloader) -> Result<PathBuf, ResumeError> {
        self.save_checkpoint(&Checkpoint::new(downloader.snapshot()))
    }

    /// Persist a prepared checkpoint
    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<PathBuf, ResumeError> {
        let path = self.path(checkpoint.asset_type());
        debug!(path = %path.display(), "Saving checkpoint");

        std::fs::create_dir_all(&self.dir).map_err(|e| ResumeError::Io(e.to_string()))?;

        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| ResumeError::Serialization(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| ResumeError::Io(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(&json)
            .map_err(|e| ResumeError::Io(format!("Failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::Io(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::Io(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&path)
            .map_err(|e| ResumeError::Io(format!("Failed to persist checkpoint: {e}")))?;

        // Make the rename itself durable
        if let Ok(dir) = std::fs::File::open(&self.dir) {
            if let Err(e) = dir.sync_all() {
                debug!(error = %e, "Directory fsync not supported");
            }
        }

        let state = checkpoint.state();
        info!(
            path = %path.display(),
            asset_type = %checkpoint.asset_type(),
            symbols = state.collected.len(),
            market_index = state.cursor.market_index,
            offset = state.cursor.offset,
            done = state.done,
            "Checkpoint saved"
        );
        Ok(path)
    }

    /// Load and validate the checkpoint of `asset_type`
    ///
    /// # Errors
    /// [`ResumeError::NotFound`] when no checkpoint exists,
    /// [`ResumeError::StateTooLarge`] above [`MAX_CHECKPOINT_FILE_SIZE`],
    /// [`ResumeError::SchemaVersionMismatch`] for another schema version and
    /// [`ResumeError::Corrupt`] for anything unreadable.
    pub fn load(&self, asset_type: AssetType) -> Result<Checkpoint, ResumeError> {
        let path = self.path(asset_type);
        debug!(path = %path.display(), "Loading checkpoint");

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResumeError::NotFound { path })
            }
            Err(e) => return Err(ResumeError::Io(e.to_string())),
        };
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(ResumeError::StateTooLarge {
                size: metadata.len(),
                max: MAX_CHECKPOINT_FILE_SIZE,
            });
        }

        let contents = std::fs::read(&path).map_err(|e| ResumeError::Io(e.to_string()))?;

        // Check the version before the shape so that a future schema is
        // reported as a mismatch rather than as corruption
        let raw: serde_json::Value = serde_json::from_slice(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Checkpoint is not valid JSON");
            ResumeError::Corrupt(e.to_string())
        })?;
        let version = raw
            .get("schema_version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ResumeError::Corrupt("missing schema_version".to_string()))?;
        if version != super::SCHEMA_VERSION {
            warn!(
                found_version = %version,
                expected_version = super::SCHEMA_VERSION,
                "Checkpoint schema version mismatch"
            );
            return Err(ResumeError::SchemaVersionMismatch {
                expected: super::SCHEMA_VERSION.to_string(),
                found: version.to_string(),
            });
        }

        let checkpoint: Checkpoint =
            serde_json::from_value(raw).map_err(|e| ResumeError::Corrupt(e.to_string()))?;
        checkpoint.validate(asset_type)?;

        info!(
            path = %path.display(),
            asset_type = %asset_type,
            symbols = checkpoint.state().collected.len(),
            done = checkpoint.state().done,
            "Checkpoint loaded"
        );
        Ok(checkpoint)
    }

    /// Load the checkpoint of `asset_type` and rebuild its downloader
    ///
    /// A snapshot the registry refuses is reported as [`ResumeError::Corrupt`],
    /// so no partially initialized downloader is ever produced.
    pub fn restore(
        &self,
        registry: &DownloaderRegistry,
        asset_type: AssetType,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Box<dyn AssetDownloader>, ResumeError> {
        let checkpoint = self.load(asset_type)?;
        registry
            .restore(fetcher, checkpoint.into_state())
            .map_err(|e| ResumeError::Corrupt(e.to_string()))
    }
}

//! Versioned checkpoint schema
//!
//! A checkpoint wraps the full [`DownloaderSnapshot`] of one asset type
//! together with the schema version it was written with. Only one schema
//! version exists; anything else is rejected on load rather than guessed at.

use serde::{Deserialize, Serialize};

use super::ResumeError;
use crate::downloader::DownloaderSnapshot;
use crate::AssetType;

/// Current checkpoint schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Persisted downloader state of one asset type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    schema_version: String,
    asset_type: AssetType,
    saved_at: i64,
    state: DownloaderSnapshot,
}

impl Checkpoint {
    /// Wrap a snapshot, stamped with the current time
    pub fn new(state: DownloaderSnapshot) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            asset_type: state.asset_type,
            saved_at: chrono::Utc::now().timestamp_millis(),
            state,
        }
    }

    /// Schema version the checkpoint was written with
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Asset type the checkpoint is keyed by
    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Save time in unix milliseconds
    pub fn saved_at(&self) -> i64 {
        self.saved_at
    }

    /// Persisted downloader state
    pub fn state(&self) -> &DownloaderSnapshot {
        &self.state
    }

    /// Take the persisted downloader state
    pub fn into_state(self) -> DownloaderSnapshot {
        self.state
    }

    /// Reject checkpoints that do not belong to `expected` or whose wrapper
    /// disagrees with the wrapped state
    pub fn validate(&self, expected: AssetType) -> Result<(), ResumeError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ResumeError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: self.schema_version.clone(),
            });
        }
        if self.asset_type != expected || self.state.asset_type != expected {
            return Err(ResumeError::Corrupt(format!(
                "checkpoint for {expected} holds {} state",
                self.state.asset_type
            )));
        }
        Ok(())
    }
}

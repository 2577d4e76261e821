//! Checkpoint persistence and session locking
//!
//! One checkpoint file per asset type holds the full downloader state, written
//! atomically. A lock file next to it keeps a second process from driving the
//! same asset type concurrently.

pub mod checkpoint;
pub mod lock;
pub mod store;

pub use checkpoint::{Checkpoint, SCHEMA_VERSION};
pub use lock::SessionLock;
pub use store::{CheckpointStore, MAX_CHECKPOINT_FILE_SIZE};

use std::path::PathBuf;

/// Errors related to checkpoints
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// No checkpoint exists for the asset type
    #[error("no checkpoint at {}", path.display())]
    NotFound {
        /// Expected checkpoint location
        path: PathBuf,
    },

    /// Checkpoint exists but cannot be used
    #[error("corrupt checkpoint: {0}")]
    Corrupt(String),

    /// Schema version mismatch
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    StateTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}

impl ResumeError {
    /// Whether this just means no session has been started yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResumeError::NotFound { .. })
    }
}

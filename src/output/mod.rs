//! Export of collected symbols
//!
//! Rows are projected once into a [`Table`] and handed to every
//! [`ExportSink`]. The delimited-text artifact is required; the other formats
//! are best effort and a failing one never stops the rest.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::AssetType;

pub mod csv;
pub mod json;
pub mod table;
pub mod xlsx;
pub mod yaml;

pub use self::csv::CsvSink;
pub use self::json::JsonSink;
pub use self::table::Table;
pub use self::xlsx::XlsxSink;
pub use self::yaml::YamlSink;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A tabular export format
pub trait ExportSink: Send + Sync {
    /// Format name used in logs and reports
    fn format(&self) -> &'static str;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Write `table` to `path`, replacing any existing file
    fn write(&self, table: &Table, path: &Path) -> OutputResult<()>;
}

/// Create the parent directory of `path` and open it for writing
pub(crate) fn create_file(path: &Path) -> OutputResult<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::Io(format!("Failed to create directory: {e}")))?;
    }
    std::fs::File::create(path)
        .map_err(|e| OutputError::Io(format!("Failed to create {}: {e}", path.display())))
}

/// Result of one export run
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Data rows written per file
    pub rows: usize,
    /// Files written, required format first
    pub written: Vec<PathBuf>,
    /// Best-effort formats that failed
    pub failed: Vec<(&'static str, OutputError)>,
}

/// Writes one table through a required sink and any number of optional ones
pub struct Exporter {
    dir: PathBuf,
    required: Box<dyn ExportSink>,
    optional: Vec<Box<dyn ExportSink>>,
}

impl Exporter {
    /// CSV (required) plus JSON, YAML and xlsx into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_sinks(
            dir,
            Box::new(CsvSink),
            vec![Box::new(JsonSink), Box::new(YamlSink), Box::new(XlsxSink)],
        )
    }

    /// Custom sink set
    pub fn with_sinks(
        dir: impl Into<PathBuf>,
        required: Box<dyn ExportSink>,
        optional: Vec<Box<dyn ExportSink>>,
    ) -> Self {
        Self {
            dir: dir.into(),
            required,
            optional,
        }
    }

    /// Export file path for `asset_type` in `sink`'s format
    pub fn path_for(&self, asset_type: AssetType, sink: &dyn ExportSink) -> PathBuf {
        self.dir
            .join(format!("{}.{}", asset_type.key(), sink.extension()))
    }

    /// Write `table` in every format
    ///
    /// # Errors
    /// Only a failure of the required sink is an error; optional failures
    /// are collected in [`ExportReport::failed`].
    pub fn export(&self, asset_type: AssetType, table: &Table) -> OutputResult<ExportReport> {
        let mut report = ExportReport {
            rows: table.len(),
            ..ExportReport::default()
        };

        let path = self.path_for(asset_type, self.required.as_ref());
        self.required.write(table, &path)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            format = self.required.format(),
            "Exported"
        );
        report.written.push(path);

        for sink in &self.optional {
            let path = self.path_for(asset_type, sink.as_ref());
            match sink.write(table, &path) {
                Ok(()) => {
                    info!(
                        path = %path.display(),
                        rows = table.len(),
                        format = sink.format(),
                        "Exported"
                    );
                    report.written.push(path);
                }
                Err(e) => {
                    warn!(format = sink.format(), error = %e, "Export failed, skipping format");
                    report.failed.push((sink.format(), e));
                }
            }
        }

        Ok(report)
    }
}

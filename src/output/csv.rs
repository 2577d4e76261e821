//! CSV export

use csv::Writer;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use super::{create_file, ExportSink, OutputError, OutputResult, Table};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Comma separated values; missing cells are empty strings
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink;

impl ExportSink for CsvSink {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, table: &Table, path: &Path) -> OutputResult<()> {
        debug!(path = %path.display(), rows = table.len(), "Writing CSV");
        let file = create_file(path)?;
        let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        writer
            .write_record(table.header())
            .map_err(|e| OutputError::Csv(format!("Failed to write header: {e}")))?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|e| OutputError::Csv(format!("Failed to write row: {e}")))?;
        }

        writer
            .flush()
            .map_err(|e| OutputError::Io(format!("Failed to flush CSV: {e}")))
    }
}

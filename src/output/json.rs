//! JSON export

use std::io::{BufWriter, Write};
use std::path::Path;

use super::{create_file, ExportSink, OutputError, OutputResult, Table};

/// Pretty JSON list of header -> value objects; missing cells are `null`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl ExportSink for JsonSink {
    fn format(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, table: &Table, path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(create_file(path)?);
        serde_json::to_writer_pretty(&mut writer, &table.records())
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| OutputError::Io(format!("Failed to flush JSON: {e}")))
    }
}

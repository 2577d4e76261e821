//! YAML export

use std::io::{BufWriter, Write};
use std::path::Path;

use super::{create_file, ExportSink, OutputError, OutputResult, Table};

/// YAML sequence of header -> value mappings; missing cells are `null`
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSink;

impl ExportSink for YamlSink {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yaml"
    }

    fn write(&self, table: &Table, path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(create_file(path)?);
        serde_yaml::to_writer(&mut writer, &table.records())
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| OutputError::Io(format!("Failed to flush YAML: {e}")))
    }
}

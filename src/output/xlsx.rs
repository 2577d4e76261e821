//! Spreadsheet export

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;
use tracing::debug;

use super::{ExportSink, OutputError, OutputResult, Table};

const SHEET_NAME: &str = "Symbols";

/// Single-sheet xlsx workbook with a bold header row; missing cells are blank
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSink;

impl From<XlsxError> for OutputError {
    fn from(e: XlsxError) -> Self {
        OutputError::Serialization(format!("xlsx: {e}"))
    }
}

impl ExportSink for XlsxSink {
    fn format(&self) -> &'static str {
        "xlsx"
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn write(&self, table: &Table, path: &Path) -> OutputResult<()> {
        debug!(path = %path.display(), rows = table.len(), "Writing xlsx");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::Io(format!("Failed to create directory: {e}")))?;
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let bold = Format::new().set_bold();
        for (col, title) in table.header().iter().enumerate() {
            sheet.write_string_with_format(0, column(col)?, title, &bold)?;
        }
        for (index, row) in table.rows().iter().enumerate() {
            let row_num = u32::try_from(index + 1)
                .map_err(|_| OutputError::Serialization("too many rows for xlsx".to_string()))?;
            for (col, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    sheet.write_string(row_num, column(col)?, value)?;
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn column(index: usize) -> OutputResult<u16> {
    u16::try_from(index)
        .map_err(|_| OutputError::Serialization("too many columns for xlsx".to_string()))
}

//! Row projection

use indexmap::IndexMap;

use crate::downloader::AssetDownloader;

/// Header row plus data rows; `None` cells are missing values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Table from prepared rows
    pub fn new(header: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { header, rows }
    }

    /// Project a downloader's collection in discovery order
    ///
    /// `exchange` keeps only symbols whose exchange code matches exactly.
    pub fn from_downloader(downloader: &dyn AssetDownloader, exchange: Option<&str>) -> Self {
        let rows = downloader
            .collected_symbols()
            .into_iter()
            .filter(|symbol| exchange.map_or(true, |code| symbol.exchange == code))
            .map(|symbol| downloader.project_row(symbol))
            .collect();
        Self::new(downloader.row_header(), rows)
    }

    /// Header row
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as header -> value maps, keeping column order
    pub fn records(&self) -> Vec<IndexMap<&str, Option<&str>>> {
        self.rows
            .iter()
            .map(|row| {
                self.header
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(Option::as_deref))
                    .collect()
            })
            .collect()
    }
}

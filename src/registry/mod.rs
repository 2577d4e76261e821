//! Asset type registry
//!
//! Maps every [`AssetType`] to the constructor of its downloader and to the
//! restorer that rebuilds one from a persisted snapshot. The registry is
//! built once at startup and passed explicitly to whoever needs it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::downloader::config::validate_page_size;
use crate::downloader::profile::{Currencies, Etfs, Futures, Indices, MutualFunds, Stocks};
use crate::downloader::{AssetDownloader, AssetProfile, DownloaderSnapshot, LookupDownloader};
use crate::fetcher::Fetch;
use crate::AssetType;

type CreateFn = fn(Arc<dyn Fetch>, u32) -> Box<dyn AssetDownloader>;
type RestoreFn = fn(Arc<dyn Fetch>, DownloaderSnapshot) -> Result<Box<dyn AssetDownloader>, String>;

/// Constructor pair for one asset type
#[derive(Clone, Copy)]
struct RegistryEntry {
    create: CreateFn,
    restore: RestoreFn,
}

impl RegistryEntry {
    fn of<P: AssetProfile>() -> Self {
        Self {
            create: |fetcher, page_size| {
                Box::new(LookupDownloader::<P>::new(fetcher, page_size)) as Box<dyn AssetDownloader>
            },
            restore: |fetcher, snapshot| {
                LookupDownloader::<P>::restore(fetcher, snapshot)
                    .map(|d| Box::new(d) as Box<dyn AssetDownloader>)
            },
        }
    }
}

/// Registry of downloader factories keyed by asset type
#[derive(Clone)]
pub struct DownloaderRegistry {
    entries: HashMap<AssetType, RegistryEntry>,
}

impl DownloaderRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with every supported asset type
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register::<Stocks>();
        registry.register::<Etfs>();
        registry.register::<Futures>();
        registry.register::<Indices>();
        registry.register::<MutualFunds>();
        registry.register::<Currencies>();
        registry
    }

    /// Register the downloader described by `P`, replacing any previous one
    pub fn register<P: AssetProfile>(&mut self) {
        self.entries.insert(P::ASSET_TYPE, RegistryEntry::of::<P>());
    }

    /// Whether `asset_type` has a registered downloader
    pub fn supports(&self, asset_type: AssetType) -> bool {
        self.entries.contains_key(&asset_type)
    }

    /// Registered asset types in listing order
    pub fn asset_types(&self) -> Vec<AssetType> {
        AssetType::ALL
            .into_iter()
            .filter(|t| self.supports(*t))
            .collect()
    }

    fn entry(&self, asset_type: AssetType) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(&asset_type)
            .ok_or(RegistryError::Unsupported(asset_type))
    }

    /// Fresh downloader for `asset_type`
    pub fn create(
        &self,
        asset_type: AssetType,
        fetcher: Arc<dyn Fetch>,
        page_size: u32,
    ) -> Result<Box<dyn AssetDownloader>, RegistryError> {
        let entry = self.entry(asset_type)?;
        let page_size = validate_page_size(page_size).map_err(RegistryError::InvalidPageSize)?;
        Ok((entry.create)(fetcher, page_size))
    }

    /// Downloader rebuilt from a persisted snapshot
    pub fn restore(
        &self,
        fetcher: Arc<dyn Fetch>,
        snapshot: DownloaderSnapshot,
    ) -> Result<Box<dyn AssetDownloader>, RegistryError> {
        let entry = self.entry(snapshot.asset_type)?;
        (entry.restore)(fetcher, snapshot).map_err(RegistryError::InvalidSnapshot)
    }
}

impl Default for DownloaderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No downloader registered for the asset type
    #[error("no downloader registered for {0}")]
    Unsupported(AssetType),

    /// Requested page size is out of range
    #[error("invalid page size: {0}")]
    InvalidPageSize(String),

    /// Snapshot could not be turned into a downloader
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

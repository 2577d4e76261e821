//! One invocation: lock, load or create, crawl, export

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{Cli, CliError};
use crate::downloader::{AssetDownloader, CrawlDriver, CrawlOutcome, CrawlReport};
use crate::fetcher::Fetch;
use crate::output::{ExportReport, Exporter, Table};
use crate::registry::DownloaderRegistry;
use crate::resume::{CheckpointStore, SessionLock};
use crate::shutdown::SharedShutdown;
use crate::AssetType;

/// What one invocation did
#[derive(Debug)]
pub struct RunOutcome {
    /// Asset type handled
    pub asset_type: AssetType,
    /// Crawl report, unless only exporting
    pub crawl: Option<CrawlReport>,
    /// Export report, when the collection was exported
    pub export: Option<ExportReport>,
    /// Whether every market is exhausted
    pub done: bool,
    /// Final progress summary
    pub summary: String,
}

/// Spinner showing the running progress summary
fn create_progress_bar(asset_type: AssetType) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(250));
    pb.set_message(format!("Downloading {asset_type} symbols"));
    pb
}

/// Operator message for a fatal error; the saved line only appears when the
/// checkpoint was actually written
fn fatal_message(
    store: &CheckpointStore,
    asset_type: AssetType,
    err: &dyn std::fmt::Display,
    saved: bool,
) -> String {
    let path = store.path(asset_type);
    let mut message = format!("\nFatal error: {err}\n");
    if saved {
        message.push_str(&format!("State saved to {}\n", path.display()));
    } else {
        message.push_str("Progress since the last checkpoint was not saved\n");
    }
    message.push_str(&format!(
        "Try removing {} if this error persists",
        path.display()
    ));
    message
}

/// Run the command described by `cli`
///
/// # Errors
/// Every error maps to exit code 1 through [`CliError::exit_code`]. Crawl
/// errors surface only after the checkpoint has been written.
pub async fn run(
    cli: &Cli,
    fetcher: Arc<dyn Fetch>,
    shutdown: SharedShutdown,
) -> Result<RunOutcome, CliError> {
    let asset_type = cli.asset_type()?;

    if let Some(addr) = cli.metrics_addr {
        crate::metrics::init_metrics(addr)
            .await
            .map_err(|e| CliError::Configuration(e.to_string()))?;
    }

    let _lock = SessionLock::try_acquire(&cli.checkpoint_dir, asset_type)?;
    let store = CheckpointStore::new(&cli.checkpoint_dir);
    let registry = DownloaderRegistry::standard();

    let mut downloader: Box<dyn AssetDownloader> =
        match store.restore(&registry, asset_type, fetcher.clone()) {
            Ok(downloader) => {
                println!("Loaded {asset_type} session: {}", downloader.progress_summary());
                downloader
            }
            Err(e) if e.is_not_found() => {
                println!("No {asset_type} checkpoint found, starting a new session");
                registry.create(asset_type, fetcher.clone(), cli.page_size)?
            }
            Err(e) => {
                error!(error = %e, "Failed to load checkpoint");
                eprintln!("{}", fatal_message(&store, asset_type, &e, false));
                return Err(e.into());
            }
        };

    let mut crawl = None;
    if !cli.export {
        if downloader.is_done() {
            println!("All {asset_type} symbols already downloaded");
        } else {
            let driver = CrawlDriver::new(&store, cli.page_options())
                .with_throttle(cli.throttle())
                .with_shutdown(shutdown);

            if let Err(e) = driver.check_policy(fetcher.as_ref()).await {
                error!(error = %e, "Robots policy check failed, not crawling");
                eprintln!("\nNot crawling: {e}");
                return Err(e.into());
            }

            let mut driver = driver.with_progress_bar(create_progress_bar(asset_type));

            match driver.run(downloader.as_mut()).await {
                Ok(report) => {
                    if report.outcome == CrawlOutcome::Interrupted {
                        println!(
                            "\nInterrupted, state saved to {}",
                            store.path(asset_type).display()
                        );
                    }
                    crawl = Some(report);
                }
                Err(e) => {
                    let saved = !e.checkpoint_failed();
                    eprintln!("{}", fatal_message(&store, asset_type, &e, saved));
                    return Err(e.into());
                }
            }
        }
    }

    let mut export = None;
    if downloader.is_done() || cli.export {
        let table = Table::from_downloader(downloader.as_ref(), cli.exchange.as_deref());
        println!("Exporting {} {asset_type} symbols", table.len());
        let report = Exporter::new(&cli.output_dir).export(asset_type, &table)?;
        for path in &report.written {
            println!("Wrote {}", path.display());
        }
        for (format, e) in &report.failed {
            eprintln!("Could not export {format}: {e}");
        }
        export = Some(report);
    }

    let summary = downloader.progress_summary();
    info!(summary = %summary, "Run finished");
    println!("{summary}");

    Ok(RunOutcome {
        asset_type,
        crawl,
        export,
        done: downloader.is_done(),
        summary,
    })
}

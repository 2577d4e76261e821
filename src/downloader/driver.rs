//! Crawl driver
//!
//! Runs one downloader page by page until it is done, throttling between
//! requests and checkpointing periodically. Every exit other than plain
//! completion goes through a checkpoint first:
//!
//! - completion: `Checkpointing` then `Done`
//! - interrupt: `Checkpointing` then `Aborted`, reported as
//!   [`CrawlOutcome::Interrupted`]
//! - network or parse failure: `Checkpointing` then `Aborted`, returned as
//!   [`CrawlError`]; when that checkpoint cannot be written either the error
//!   is [`CrawlError::Unsaved`]
//!
//! Failed pages are not retried in process; rerunning resumes from the
//! checkpoint.

use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::config::{CHECKPOINT_INTERVAL_PAGES, USER_AGENT};
use super::{AssetDownloader, DownloadError, PageOptions};
use crate::fetcher::{Fetch, FetcherError, RobotsPolicy};
use crate::metrics::{self, CrawlMetrics};
use crate::resume::{CheckpointStore, ResumeError};
use crate::shutdown::SharedShutdown;
use crate::Symbol;

/// Driver states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Fetching the next page
    Running,
    /// Sleeping between pages
    Throttling,
    /// Writing a checkpoint
    Checkpointing,
    /// Every market exhausted and saved
    Done,
    /// Stopped early after saving
    Aborted,
}

/// How a crawl run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The downloader became done during this run
    Completed,
    /// The downloader was done before the run; nothing was fetched
    AlreadyDone,
    /// Interrupted; progress was checkpointed
    Interrupted,
}

impl CrawlOutcome {
    fn label(&self) -> &'static str {
        match self {
            CrawlOutcome::Completed => "completed",
            CrawlOutcome::AlreadyDone => "already_done",
            CrawlOutcome::Interrupted => "interrupted",
        }
    }
}

/// Summary of one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// How the run ended
    pub outcome: CrawlOutcome,
    /// Pages fetched during this run
    pub pages: u64,
    /// New symbols collected during this run
    pub symbols_added: u64,
    /// Periodic checkpoints written during this run
    pub periodic_checkpoints: u64,
    /// Last checkpoint written, if any
    pub checkpoint: Option<PathBuf>,
}

impl CrawlReport {
    fn new(outcome: CrawlOutcome) -> Self {
        Self {
            outcome,
            pages: 0,
            symbols_added: 0,
            periodic_checkpoints: 0,
            checkpoint: None,
        }
    }
}

/// Fatal crawl errors
///
/// Progress has been checkpointed before they surface unless
/// [`CrawlError::checkpoint_failed`] says otherwise.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Transport failure
    #[error("network error: {0}")]
    Network(#[from] FetcherError),

    /// Unreadable page or, in strict mode, a malformed record
    #[error("parse error: {0}")]
    Parse(String),

    /// Checkpoint could not be written
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] ResumeError),

    /// Crawling is disallowed for our user agent
    #[error("crawling {0} is disallowed by robots.txt")]
    Policy(String),

    /// A network or parse failure whose checkpoint could not be written
    #[error("{cause} (progress not saved: {checkpoint})")]
    Unsaved {
        /// Failure that stopped the crawl
        cause: Box<CrawlError>,
        /// Why the checkpoint failed
        checkpoint: ResumeError,
    },
}

impl CrawlError {
    /// Whether progress since the last successful checkpoint was lost
    pub fn checkpoint_failed(&self) -> bool {
        matches!(self, CrawlError::Checkpoint(_) | CrawlError::Unsaved { .. })
    }
}

/// Drives one downloader to completion
pub struct CrawlDriver<'a> {
    store: &'a CheckpointStore,
    options: PageOptions,
    throttle: Duration,
    checkpoint_interval: u64,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
    state: CrawlState,
    history: Vec<CrawlState>,
}

impl<'a> CrawlDriver<'a> {
    /// Driver saving into `store`, paging with `options`
    pub fn new(store: &'a CheckpointStore, options: PageOptions) -> Self {
        Self {
            store,
            options,
            throttle: Duration::ZERO,
            checkpoint_interval: CHECKPOINT_INTERVAL_PAGES,
            shutdown: None,
            progress: None,
            state: CrawlState::Running,
            history: Vec::new(),
        }
    }

    /// Sleep this long after every page that does not finish the crawl
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Attach a shared shutdown handle for cooperative interruption
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Override the periodic checkpoint interval (pages, at least 1)
    pub fn with_checkpoint_interval(mut self, pages: u64) -> Self {
        self.checkpoint_interval = pages.max(1);
        self
    }

    /// Show the running progress summary on a spinner
    pub fn with_progress_bar(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Current state
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// States entered so far, in order, without consecutive repeats
    pub fn history(&self) -> &[CrawlState] {
        &self.history
    }

    fn enter(&mut self, state: CrawlState) {
        if self.history.last() != Some(&state) {
            debug!(from = ?self.state, to = ?state, "Crawl state change");
            self.history.push(state);
        }
        self.state = state;
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_requested())
            .unwrap_or(false)
    }

    /// Check robots.txt once before crawling
    ///
    /// # Errors
    /// [`CrawlError::Policy`] when the lookup is disallowed and
    /// [`CrawlError::Network`] when the policy cannot be fetched.
    pub async fn check_policy(&self, fetcher: &dyn Fetch) -> Result<(), CrawlError> {
        let allowed =
            RobotsPolicy::lookup_allowed(fetcher, self.options.secure, USER_AGENT).await?;
        if allowed {
            Ok(())
        } else {
            error!(user_agent = USER_AGENT, "Symbol lookup is disallowed by robots.txt");
            Err(CrawlError::Policy(crate::fetcher::lookup::LOOKUP_PATH.to_string()))
        }
    }

    /// Run `downloader` until it is done, interrupted or fails
    ///
    /// A downloader that is already done is left untouched and no fetch is
    /// made.
    pub async fn run(
        &mut self,
        downloader: &mut dyn AssetDownloader,
    ) -> Result<CrawlReport, CrawlError> {
        let span = info_span!("crawl", asset_type = %downloader.asset_type());
        self.run_inner(downloader).instrument(span).await
    }

    async fn run_inner(
        &mut self,
        downloader: &mut dyn AssetDownloader,
    ) -> Result<CrawlReport, CrawlError> {
        if downloader.is_done() {
            info!(summary = %downloader.progress_summary(), "Nothing to download, already done");
            self.enter(CrawlState::Done);
            return Ok(CrawlReport::new(CrawlOutcome::AlreadyDone));
        }

        info!(
            summary = %downloader.progress_summary(),
            throttle_ms = self.throttle.as_millis() as u64,
            strict = self.options.strict,
            "Starting crawl"
        );
        let crawl_metrics = CrawlMetrics::start(downloader.asset_type());
        let mut report = CrawlReport::new(CrawlOutcome::Completed);

        loop {
            if self.shutdown_requested() {
                return self.interrupt(downloader, report, &crawl_metrics);
            }

            self.enter(CrawlState::Running);
            match downloader.next_page(&self.options).await {
                Ok(symbols) => {
                    report.pages += 1;
                    report.symbols_added += symbols.len() as u64;
                    self.report_page(downloader, &symbols);
                }
                Err(DownloadError::AlreadyDone) => {}
                Err(DownloadError::Network(e)) => {
                    return Err(self.fail(downloader, CrawlError::Network(e), &crawl_metrics));
                }
                Err(DownloadError::Parse(reason)) => {
                    return Err(self.fail(downloader, CrawlError::Parse(reason), &crawl_metrics));
                }
            }

            if downloader.is_done() {
                self.enter(CrawlState::Checkpointing);
                match self.checkpoint(downloader, "completed") {
                    Ok(path) => report.checkpoint = Some(path),
                    Err(e) => {
                        self.enter(CrawlState::Aborted);
                        crawl_metrics.record_finished("failed");
                        return Err(e.into());
                    }
                }
                self.enter(CrawlState::Done);
                if let Some(progress) = &self.progress {
                    progress.finish_with_message(downloader.progress_summary());
                }
                info!(
                    pages = report.pages,
                    symbols_added = report.symbols_added,
                    summary = %downloader.progress_summary(),
                    "Crawl completed"
                );
                crawl_metrics.record_finished(report.outcome.label());
                return Ok(report);
            }

            if report.pages > 0 && report.pages % self.checkpoint_interval == 0 {
                self.enter(CrawlState::Checkpointing);
                match self.checkpoint(downloader, "periodic") {
                    Ok(path) => {
                        report.periodic_checkpoints += 1;
                        report.checkpoint = Some(path);
                    }
                    Err(e) => {
                        self.enter(CrawlState::Aborted);
                        crawl_metrics.record_finished("failed");
                        return Err(e.into());
                    }
                }
            }

            if !self.throttle.is_zero() {
                self.enter(CrawlState::Throttling);
                self.sleep_throttle().await;
            }
        }
    }

    fn report_page(&self, downloader: &dyn AssetDownloader, symbols: &[Symbol]) {
        let sample: Vec<&str> = symbols.iter().take(2).map(|s| s.ticker.as_str()).collect();
        let more = if symbols.len() > 2 { " etc" } else { "" };
        info!(
            new_symbols = symbols.len(),
            sample = %format!("{}{more}", sample.join(", ")),
            "Got {} downloaded {} symbols",
            symbols.len(),
            downloader.asset_type()
        );
        if let Some(progress) = &self.progress {
            progress.set_message(downloader.progress_summary());
            progress.tick();
        }
    }

    /// Race the throttle sleep against shutdown
    async fn sleep_throttle(&self) {
        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.throttle) => {},
                    _ = shutdown.wait() => {},
                }
            }
            None => tokio::time::sleep(self.throttle).await,
        }
    }

    fn checkpoint(
        &self,
        downloader: &dyn AssetDownloader,
        reason: &'static str,
    ) -> Result<PathBuf, ResumeError> {
        let path = self.store.save(downloader)?;
        metrics::record_checkpoint(reason);
        Ok(path)
    }

    fn interrupt(
        &mut self,
        downloader: &dyn AssetDownloader,
        mut report: CrawlReport,
        crawl_metrics: &CrawlMetrics,
    ) -> Result<CrawlReport, CrawlError> {
        warn!(summary = %downloader.progress_summary(), "Crawl interrupted");
        self.enter(CrawlState::Checkpointing);
        let saved = self.checkpoint(downloader, "interrupt");
        self.enter(CrawlState::Aborted);
        if let Some(progress) = &self.progress {
            progress.abandon_with_message("interrupted");
        }

        report.outcome = CrawlOutcome::Interrupted;
        crawl_metrics.record_finished(report.outcome.label());
        report.checkpoint = Some(saved?);
        Ok(report)
    }

    /// Checkpoint after a fatal error; a failed save is wrapped around the
    /// original error as [`CrawlError::Unsaved`]
    fn fail(
        &mut self,
        downloader: &dyn AssetDownloader,
        err: CrawlError,
        crawl_metrics: &CrawlMetrics,
    ) -> CrawlError {
        error!(error = %err, summary = %downloader.progress_summary(), "Crawl failed");
        self.enter(CrawlState::Checkpointing);
        let err = match self.checkpoint(downloader, "error") {
            Ok(_) => err,
            Err(save_err) => {
                error!(error = %save_err, "Failed to save checkpoint after crawl error");
                CrawlError::Unsaved {
                    cause: Box::new(err),
                    checkpoint: save_err,
                }
            }
        };
        self.enter(CrawlState::Aborted);
        if let Some(progress) = &self.progress {
            progress.abandon_with_message("failed");
        }
        crawl_metrics.record_finished("failed");
        err
    }
}

//! Main entry point for the ticker-symbol-downloader CLI

use clap::Parser;
use std::sync::Arc;
use ticker_symbol_downloader::cli::{self, Cli, CliError, RunOutcome};
use ticker_symbol_downloader::fetcher::http::HttpFetcher;
use ticker_symbol_downloader::shutdown::{SharedShutdown, ShutdownSignal};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ticker_symbol_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn execute(cli: &Cli, shutdown: SharedShutdown) -> Result<RunOutcome, CliError> {
    let fetcher = Arc::new(HttpFetcher::new()?);
    cli::run(cli, fetcher, shutdown).await
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Ctrl+C only sets the flag; the driver checkpoints before stopping
    let shutdown = ShutdownSignal::shared();
    shutdown.listen_for_ctrl_c();

    let result = execute(&cli, shutdown).await.map_err(anyhow::Error::from);

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

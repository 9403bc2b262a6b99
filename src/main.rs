//! # Archive Harvester
//!
//! Walks a publication's monthly archive pages in a headless browser, clicks
//! through each month's "load more" control until the listing is complete,
//! and writes every article found to `articles.html` and `articles.json`,
//! newest first.
//!
//! ## Usage
//!
//! ```sh
//! archive_harvester -o ./out
//! archive_harvester --start 2023-01 --end 2023-12 --on-period-failure abort
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Enumerate**: One period per calendar month from the start month to now
//! 2. **Expand**: Load each month's archive page and click "load more" until it disappears
//! 3. **Extract**: Read title, link and timestamp from every article container
//! 4. **Aggregate**: Merge all months, drop repeated URLs, sort newest first
//! 5. **Output**: Write the HTML listing and the JSON record

use clap::Parser;
use std::error::Error;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod browser;
mod cli;
mod config;
mod crawler;
mod extractor;
mod models;
mod outputs;
mod periods;
mod pipeline;
mod utils;

use browser::chrome::ChromeSession;
use browser::retry::RetryingPage;
use cli::Cli;
use config::HarvestConfig;
use outputs::FsSink;
use pipeline::HarvestSummary;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive_harvester starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = HarvestConfig::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    let settings = config.resolve()?;
    info!(
        start = %settings.start,
        end = ?settings.end,
        base_url = %settings.base_url,
        output_dir = %settings.output_dir,
        policy = ?settings.on_period_failure,
        "Resolved configuration"
    );

    // Fail before launching a browser if the results could not be saved.
    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(
            path = %settings.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, ctrl_c).await {
            error!("Second interrupt received; exiting without writing results");
            std::process::exit(EXIT_INTERRUPTED);
        }
    });

    let session = ChromeSession::launch(settings.headless).await?;
    let page = match session.new_page().await {
        Ok(page) => page,
        Err(e) => {
            session.close().await;
            return Err(e.into());
        }
    };
    let mut page = RetryingPage::new(page, settings.retry);
    let sink = FsSink::new(&settings.output_dir);

    let result = pipeline::run(&mut page, &sink, &settings, &cancel).await;
    session.close().await;

    let elapsed = start_time.elapsed();
    match result {
        Ok(summary) => {
            info!(
                ?elapsed,
                records = summary.records,
                periods_skipped = summary.skipped.len(),
                items_skipped = summary.structural_faults,
                "Execution complete"
            );
            print_summary(&summary);
            Ok(())
        }
        Err(failure) => {
            error!(?elapsed, error = %failure.error, "Harvest failed");
            print_summary(&failure.summary);
            Err(failure.into())
        }
    }
}

/// Exit status used when a second interrupt forces an immediate exit.
const EXIT_INTERRUPTED: i32 = 130;

/// Cancel `cancel` on the first interrupt, then wait for another.
///
/// Resolves `true` once a second interrupt arrives and `false` if the signal
/// listener fails before that.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    warn!(
        "Interrupt received; finishing current step and writing partial results \
         (Ctrl-C again to quit now)"
    );
    cancel.cancel();
    interrupt().await.is_ok()
}

fn print_summary(summary: &HarvestSummary) {
    println!(
        "Harvested {} articles from {} of {} months ({} months skipped, {} items skipped)",
        summary.records,
        summary.periods_crawled,
        summary.periods_total,
        summary.skipped.len(),
        summary.structural_faults
    );
}

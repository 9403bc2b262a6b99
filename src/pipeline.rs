//! The harvest pipeline: enumerate periods, expand and extract each one in
//! turn, aggregate, then write both artifacts.
//!
//! Periods are processed strictly one after another on a single page. For a
//! given period extraction only starts once the expansion loop has returned,
//! so the page is never read while it is still loading.
//!
//! # Fault containment
//!
//! | Fault | Effect |
//! |-------|--------|
//! | Malformed article container | Item dropped, counted in the summary |
//! | Navigation failure (network or non-2xx status), stuck control, failing clicks | Period skipped or run aborted, per [`FailurePolicy`] |
//! | Browser session lost | Run aborted |
//! | Artifact write failure | Run fails after attempting both artifacts |
//! | Cancellation | Periods stop, run fails |
//!
//! However the run ends, the summary is reported and the records collected
//! from completed periods are written before [`run`] returns. A failed run
//! hands the summary back inside [`HarvestFailure`].

use crate::aggregate::aggregate;
use crate::browser::{ArchivePage, BrowserError};
use crate::config::{FailurePolicy, HarvestSettings};
use crate::crawler::{CrawlError, crawl};
use crate::extractor::{Extraction, extract};
use crate::models::{ArticleRecord, Period};
use crate::outputs::{self, ArtifactSink, OutputError};
use crate::periods;
use crate::utils::truncate_for_log;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Faults that end the run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("period {period} failed: {source}")]
    Period { period: Period, source: CrawlError },

    #[error("browser session lost while crawling {period}: {source}")]
    Session {
        period: Period,
        source: BrowserError,
    },

    #[error("cannot build archive URL for {period}: {source}")]
    ArchiveUrl {
        period: Period,
        source: url::ParseError,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("harvest cancelled after {completed} of {total} periods")]
    Cancelled { completed: usize, total: usize },
}

/// A failed run together with what it managed to do before failing.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct HarvestFailure {
    pub summary: HarvestSummary,
    #[source]
    pub error: HarvestError,
}

/// A period that produced no records because of a contained fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPeriod {
    pub period: Period,
    pub reason: String,
}

/// What the run did, reported at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub periods_total: usize,
    pub periods_crawled: usize,
    pub skipped: Vec<SkippedPeriod>,
    pub structural_faults: usize,
    pub duplicates_dropped: usize,
    pub records: usize,
    pub cancelled: bool,
}

impl HarvestSummary {
    /// Log the final tally, one warning per skipped period.
    pub fn report(&self) {
        for skipped in &self.skipped {
            warn!(period = %skipped.period, reason = %skipped.reason, "Period skipped");
        }
        info!(
            records = self.records,
            periods_total = self.periods_total,
            periods_crawled = self.periods_crawled,
            periods_skipped = self.skipped.len(),
            items_skipped = self.structural_faults,
            duplicates_dropped = self.duplicates_dropped,
            cancelled = self.cancelled,
            "Harvest summary"
        );
    }
}

/// The ordered collection plus its summary.
#[derive(Debug)]
pub struct Harvest {
    pub articles: Vec<ArticleRecord>,
    pub summary: HarvestSummary,
    /// The fault that stopped the run before every period was visited.
    pub halted: Option<HarvestError>,
}

/// Crawl the configured range, write both artifacts through `sink`, and
/// return the summary.
///
/// # Arguments
///
/// * `page` - The page every period is loaded into
/// * `sink` - Destination for `articles.html` and `articles.json`
/// * `settings` - Resolved run settings
/// * `cancel` - Token that stops the run between steps
///
/// # Returns
///
/// The summary on success. On an aborted, cancelled or unwritable run a
/// [`HarvestFailure`] carrying the same summary; whatever was collected has
/// still been written by then.
#[instrument(level = "info", skip_all, fields(start = %settings.start))]
pub async fn run<P, S>(
    page: &mut P,
    sink: &S,
    settings: &HarvestSettings,
    cancel: &CancellationToken,
) -> Result<HarvestSummary, HarvestFailure>
where
    P: ArchivePage,
    S: ArtifactSink,
{
    let periods = match settings.end {
        Some(end) => periods::enumerate(settings.start, end),
        None => periods::through_current(settings.start),
    };
    if periods.is_empty() {
        warn!(start = %settings.start, end = ?settings.end, "Start period is after end period; nothing to crawl");
    }

    let Harvest {
        articles,
        summary,
        halted,
    } = harvest(page, &periods, settings, cancel).await;
    summary.report();

    if halted.is_some() && !articles.is_empty() {
        warn!(records = articles.len(), "Run halted; writing partial results");
    }
    let heading = format!(
        "{} Articles Since {}",
        settings.publication,
        settings.start.year()
    );
    let written = outputs::write(&articles, &heading, sink).await;

    let error = match (halted, written) {
        (Some(halt), Err(output)) => {
            error!(error = %output, "Partial results could not be written either");
            Some(halt)
        }
        (Some(halt), Ok(_)) => Some(halt),
        (None, Err(output)) => Some(HarvestError::Output(output)),
        (None, Ok(_)) if summary.cancelled => Some(HarvestError::Cancelled {
            completed: summary.periods_crawled + summary.skipped.len(),
            total: summary.periods_total,
        }),
        (None, Ok(_)) => None,
    };
    match error {
        Some(error) => Err(HarvestFailure { summary, error }),
        None => Ok(summary),
    }
}

/// Expand and extract every period in order, then aggregate.
///
/// # Arguments
///
/// * `page` - The page every period is loaded into
/// * `periods` - Months to visit, in order
/// * `settings` - Resolved run settings; `on_period_failure` decides whether
///   a failed period is skipped or ends the loop
/// * `cancel` - Token checked before each period and inside the expansion loop
///
/// # Returns
///
/// A [`Harvest`] holding the aggregated records of every completed period.
/// When a fault ended the loop early it is kept in `halted`; the records
/// gathered up to that point are still aggregated.
pub async fn harvest<P: ArchivePage>(
    page: &mut P,
    periods: &[Period],
    settings: &HarvestSettings,
    cancel: &CancellationToken,
) -> Harvest {
    let total = periods.len();
    let mut summary = HarvestSummary {
        periods_total: total,
        ..HarvestSummary::default()
    };
    let mut batches: Vec<Vec<ArticleRecord>> = Vec::with_capacity(total);
    let mut halted = None;

    for (i, &period) in periods.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let url = match period.archive_url(&settings.base_url) {
            Ok(url) => url,
            Err(source) => {
                halted = Some(HarvestError::ArchiveUrl { period, source });
                break;
            }
        };
        info!(%period, %url, progress = %format!("{}/{}", i + 1, total), "Scraping");

        match harvest_period(page, period, &url, settings, cancel).await {
            Ok(extraction) => {
                for fault in &extraction.faults {
                    warn!(%period, index = fault.index, fault = %fault.kind, "Skipped malformed article");
                }
                info!(
                    %period,
                    records = extraction.records.len(),
                    skipped_items = extraction.faults.len(),
                    "Period harvested"
                );
                summary.periods_crawled += 1;
                summary.structural_faults += extraction.faults.len();
                batches.push(extraction.records);
            }
            Err(CrawlError::Cancelled) => {
                warn!(%period, "Cancelled mid-period; discarding its partial listing");
                summary.cancelled = true;
                break;
            }
            Err(CrawlError::Browser(source)) if source.is_session_fatal() => {
                error!(%period, error = %source, "Browser session lost; stopping");
                halted = Some(HarvestError::Session { period, source });
                break;
            }
            Err(source) => match settings.on_period_failure {
                FailurePolicy::Abort => {
                    error!(%period, error = %source, "Period failed; aborting");
                    halted = Some(HarvestError::Period { period, source });
                    break;
                }
                FailurePolicy::Skip => {
                    warn!(%period, error = %source, "Period failed; skipping");
                    summary.skipped.push(SkippedPeriod {
                        period,
                        reason: source.to_string(),
                    });
                }
            },
        }
    }

    let aggregate = aggregate(batches, settings.dedupe);
    summary.duplicates_dropped = aggregate.duplicates_dropped;
    summary.records = aggregate.articles.len();
    Harvest {
        articles: aggregate.articles,
        summary,
        halted,
    }
}

async fn harvest_period<P: ArchivePage>(
    page: &mut P,
    period: Period,
    url: &Url,
    settings: &HarvestSettings,
    cancel: &CancellationToken,
) -> Result<Extraction, CrawlError> {
    crawl(page, period, url, &settings.crawl, cancel).await?;
    let html = page.html().await?;
    let extraction = extract(&html, url, &settings.selectors);
    if extraction.records.is_empty() && extraction.faults.is_empty() {
        debug!(%period, html = %truncate_for_log(&html, 300), "No article containers on page");
    }
    Ok(extraction)
}

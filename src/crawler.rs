//! Paginated expansion of one archive month.
//!
//! An archive page initially shows a slice of the month's listing plus a
//! "load more" control. [`crawl`] navigates to the page and keeps activating
//! that control until it stops appearing, leaving the page fully expanded
//! for the extractor.
//!
//! # Termination
//!
//! - The control not showing up within `wait_timeout` ends the loop normally.
//! - More than `max_expansions` clicks is [`CrawlError::ExpansionLimit`].
//! - A cancelled token is [`CrawlError::Cancelled`], checked before every probe.
//! - Any [`BrowserError`] (navigation, a click that keeps failing) is
//!   [`CrawlError::Browser`]; it is never mistaken for exhaustion.

use crate::browser::{ArchivePage, BrowserError, Presence};
use crate::models::Period;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

/// Knobs for the expansion loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub load_more_selector: String,
    pub wait_timeout: Duration,
    pub settle: Duration,
    pub max_expansions: usize,
}

/// Result of a fully expanded period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    /// Probes for the control, including the final one that found nothing.
    pub iterations: usize,
    /// Successful load-more clicks.
    pub clicks: usize,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("load-more control still present after {limit} clicks")]
    ExpansionLimit { limit: usize },

    #[error("crawl cancelled")]
    Cancelled,
}

/// Navigate to `url` and expand the listing until the control is gone.
///
/// # Arguments
///
/// * `page` - The page to drive
/// * `period` - The month being crawled, used for logging
/// * `url` - Archive page for `period`
/// * `settings` - Control selector, wait deadline, settle pause and click cap
/// * `cancel` - Checked before navigating and before every probe
///
/// # Returns
///
/// The iteration and click counts. On success the page holds the complete
/// listing for `period`. Fails with [`CrawlError::Browser`] on a navigation
/// or interaction fault, [`CrawlError::ExpansionLimit`] when the control
/// outlives `max_expansions` clicks, and [`CrawlError::Cancelled`].
#[instrument(level = "info", skip_all, fields(%period, %url))]
pub async fn crawl<P: ArchivePage>(
    page: &mut P,
    period: Period,
    url: &Url,
    settings: &CrawlSettings,
    cancel: &CancellationToken,
) -> Result<Expansion, CrawlError> {
    if cancel.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }
    page.goto(url).await?;

    let mut expansion = Expansion {
        iterations: 0,
        clicks: 0,
    };
    loop {
        if cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        expansion.iterations += 1;

        let presence = page
            .wait_for(&settings.load_more_selector, settings.wait_timeout)
            .await?;
        if presence == Presence::Absent {
            break;
        }
        if expansion.clicks >= settings.max_expansions {
            return Err(CrawlError::ExpansionLimit {
                limit: settings.max_expansions,
            });
        }

        page.click(&settings.load_more_selector).await?;
        expansion.clicks += 1;
        debug!(iteration = expansion.iterations, "Clicked load-more");
        page.settle(settings.settle).await;
    }

    info!(
        iterations = expansion.iterations,
        clicks = expansion.clicks,
        "Listing fully expanded"
    );
    Ok(expansion)
}

//! The rendering-engine seam the crawler drives.
//!
//! An [`ArchivePage`] is one live page inside one browser session. The crawler
//! only ever needs five things from it: navigate, probe for an element with a
//! deadline, click, pause, and serialize the live DOM.
//!
//! # Implementations
//!
//! | Type | Module | Notes |
//! |------|--------|-------|
//! | [`chrome::ChromeSession`] / [`chrome::ChromePage`] | [`chrome`] | Headless Chromium over CDP |
//! | [`retry::RetryingPage`] | [`retry`] | Retries transient faults of any page |
//!
//! # Absence is not an error
//!
//! [`ArchivePage::wait_for`] reports a missing element as [`Presence::Absent`].
//! Only genuine failures (the page could not be queried at all) surface as a
//! [`BrowserError`]. An error document served with a non-2xx status is a
//! failed navigation, never an empty listing.

use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod chrome;
pub mod retry;

#[cfg(test)]
pub mod scripted;

/// Outcome of waiting for a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Found,
    Absent,
}

/// Failures reported by the rendering engine.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("interaction with `{selector}` failed: {reason}")]
    Interaction { selector: String, reason: String },

    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl BrowserError {
    /// Faults worth retrying: a flaky click or a failed DOM query.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::Interaction { .. } | BrowserError::Evaluation(_)
        )
    }

    /// Faults that leave no usable session behind.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_) | BrowserError::Launch(_))
    }
}

/// Reject a navigation whose main document came back with a non-2xx status.
///
/// `status` is `None` when the engine recorded no HTTP response for the
/// document (for example `about:blank`), which is accepted.
pub fn check_response_status(url: &Url, status: Option<i64>) -> Result<(), BrowserError> {
    match status {
        Some(code) if !(200..300).contains(&code) => Err(BrowserError::Navigation {
            url: url.to_string(),
            reason: format!("HTTP {}", code),
        }),
        _ => Ok(()),
    }
}

/// One page context in a browser session.
///
/// Methods take `&mut self`: a page is driven by exactly one caller at a time.
pub trait ArchivePage {
    /// Navigate to an absolute URL and wait for the load to finish.
    async fn goto(&mut self, url: &Url) -> Result<(), BrowserError>;

    /// Wait up to `timeout` for `selector` to match.
    async fn wait_for(&mut self, selector: &str, timeout: Duration)
    -> Result<Presence, BrowserError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Pause so freshly loaded content can attach to the page.
    async fn settle(&mut self, pause: Duration) {
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    /// Serialize the live DOM from inside the page context.
    async fn html(&mut self) -> Result<String, BrowserError>;
}

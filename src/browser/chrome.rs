//! Headless Chromium session driven over the DevTools protocol.
//!
//! [`ChromeSession`] owns the browser process and the task pumping its CDP
//! event stream. When that task ends the browser is gone, so every later
//! failure on a [`ChromePage`] is reported as [`BrowserError::SessionLost`]
//! instead of a per-page fault.

use super::{ArchivePage, BrowserError, Presence, check_response_status};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Interval between DOM probes while waiting for a selector.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A launched browser plus the task driving its CDP connection.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    alive: Arc<AtomicBool>,
}

impl ChromeSession {
    /// Launch Chromium, headless unless `headless` is false.
    #[instrument(level = "info", skip_all, fields(headless = headless))]
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let builder = BrowserConfig::builder();
        let builder = if headless { builder } else { builder.with_head() };
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
            flag.store(false, Ordering::SeqCst);
            debug!("CDP handler stream ended");
        });

        info!("Browser session launched");
        Ok(Self {
            browser,
            handler,
            alive,
        })
    }

    /// Open a blank page in this session.
    pub async fn new_page(&self) -> Result<ChromePage, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::SessionLost(e.to_string()))?;
        Ok(ChromePage {
            page,
            alive: Arc::clone(&self.alive),
        })
    }

    /// Close the browser and wait for the process and handler task to exit.
    #[instrument(level = "info", skip_all)]
    pub async fn close(mut self) {
        if self.alive.load(Ordering::SeqCst) {
            if let Err(e) = self.browser.close().await {
                warn!(error = %e, "Failed to close browser cleanly");
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to reap browser process");
        }
        if let Err(e) = self.handler.await {
            warn!(error = %e, "CDP handler task failed");
        }
        info!("Browser session closed");
    }
}

/// One tab of a [`ChromeSession`].
pub struct ChromePage {
    page: Page,
    alive: Arc<AtomicBool>,
}

impl ChromePage {
    /// Blame the session if the CDP connection is gone, the page otherwise.
    fn lost_or(
        &self,
        err: impl ToString,
        otherwise: impl FnOnce(String) -> BrowserError,
    ) -> BrowserError {
        let reason = err.to_string();
        if self.alive.load(Ordering::SeqCst) {
            otherwise(reason)
        } else {
            BrowserError::SessionLost(reason)
        }
    }
}

impl ArchivePage for ChromePage {
    async fn goto(&mut self, url: &Url) -> Result<(), BrowserError> {
        let navigation = |reason| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };
        if let Err(e) = self.page.goto(url.as_str()).await {
            return Err(self.lost_or(e, navigation));
        }
        // `goto` only fails on network errors; an HTTP error page still loads.
        let request = match self.page.wait_for_navigation_response().await {
            Ok(request) => request,
            Err(e) => return Err(self.lost_or(e, navigation)),
        };
        let status = request
            .as_ref()
            .and_then(|request| request.response.as_ref())
            .map(|response| response.status);
        debug!(%url, ?status, "Navigation response");
        check_response_status(url, status)
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Presence, BrowserError> {
        let probe = presence_probe(selector);
        let deadline = Instant::now() + timeout;
        loop {
            let found = match self.page.evaluate(probe.clone()).await {
                Ok(result) => result
                    .into_value::<bool>()
                    .map_err(|e| BrowserError::Evaluation(e.to_string()))?,
                Err(e) => return Err(self.lost_or(e, BrowserError::Evaluation)),
            };
            if found {
                return Ok(Presence::Found);
            }
            if Instant::now() >= deadline {
                return Ok(Presence::Absent);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let interaction = |reason| BrowserError::Interaction {
            selector: selector.to_string(),
            reason,
        };
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => return Err(self.lost_or(e, interaction)),
        };
        match element.click().await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.lost_or(e, interaction)),
        }
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        match self.page.content().await {
            Ok(html) => Ok(html),
            Err(e) => Err(self.lost_or(e, BrowserError::Evaluation)),
        }
    }
}

/// JavaScript expression that is `true` once `selector` matches an element.
fn presence_probe(selector: &str) -> String {
    // A JSON string literal is also a valid JavaScript string literal.
    let literal = serde_json::Value::String(selector.to_string()).to_string();
    format!("document.querySelector({}) !== null", literal)
}

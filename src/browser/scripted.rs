//! In-memory [`ArchivePage`] used by the test suites.
//!
//! Each archive URL maps to a [`PageScript`] describing the markup that is
//! visible initially, how many times the load-more control can be clicked,
//! what each click reveals, and which faults to inject.

use super::{ArchivePage, BrowserError, Presence, check_response_status};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct PageScript {
    initial: String,
    revealed: Vec<String>,
    /// Clicks the control survives; `None` keeps it on the page forever.
    load_more: Option<usize>,
    flaky_clicks: usize,
    flaky_waits: usize,
    fail_navigation: bool,
    http_status: Option<i64>,
    lose_session: bool,
}

impl PageScript {
    pub fn new(initial: &str) -> Self {
        Self {
            initial: initial.to_string(),
            load_more: Some(0),
            ..Self::default()
        }
    }

    /// The control survives `clicks` activations, revealing nothing new.
    pub fn load_more(mut self, clicks: usize) -> Self {
        self.load_more = Some(clicks);
        self
    }

    /// One more click is available and it attaches `markup` to the listing.
    pub fn then_reveal(mut self, markup: &str) -> Self {
        self.revealed.push(markup.to_string());
        self.load_more = Some(self.revealed.len());
        self
    }

    /// The control never goes away.
    pub fn always_load_more(mut self) -> Self {
        self.load_more = None;
        self
    }

    pub fn flaky_clicks(mut self, failures: usize) -> Self {
        self.flaky_clicks = failures;
        self
    }

    pub fn flaky_waits(mut self, failures: usize) -> Self {
        self.flaky_waits = failures;
        self
    }

    pub fn fail_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// The document is served with this HTTP status instead of 200.
    pub fn http_status(mut self, status: i64) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn lose_session(mut self) -> Self {
        self.lose_session = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct ScriptedPage {
    scripts: HashMap<String, PageScript>,
    current: Option<String>,
    clicks_on_page: usize,
    flaky_clicks_left: usize,
    flaky_waits_left: usize,
    session_lost: bool,
    cancel_after: Option<(usize, CancellationToken)>,
    navigations: usize,
    waits: usize,
    click_attempts: usize,
    clicks: usize,
    /// Clicks already applied to the current page each time `html` ran.
    html_reads: Vec<usize>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: Url, script: PageScript) {
        self.scripts.insert(url.to_string(), script);
    }

    /// Cancel `token` once `clicks` successful clicks have happened in total.
    pub fn cancel_after_clicks(&mut self, clicks: usize, token: CancellationToken) {
        self.cancel_after = Some((clicks, token));
    }

    pub fn navigations(&self) -> usize {
        self.navigations
    }

    pub fn waits(&self) -> usize {
        self.waits
    }

    pub fn click_attempts(&self) -> usize {
        self.click_attempts
    }

    pub fn clicks(&self) -> usize {
        self.clicks
    }

    pub fn html_reads(&self) -> &[usize] {
        &self.html_reads
    }

    fn script(&self) -> Result<&PageScript, BrowserError> {
        self.current
            .as_ref()
            .and_then(|url| self.scripts.get(url))
            .ok_or_else(|| BrowserError::Evaluation("no document loaded".to_string()))
    }

    fn control_present(&self) -> Result<bool, BrowserError> {
        let script = self.script()?;
        Ok(match script.load_more {
            None => true,
            Some(clicks) => self.clicks_on_page < clicks,
        })
    }
}

impl ArchivePage for ScriptedPage {
    async fn goto(&mut self, url: &Url) -> Result<(), BrowserError> {
        self.navigations += 1;
        if self.session_lost {
            return Err(BrowserError::SessionLost("target closed".to_string()));
        }
        let Some(script) = self.scripts.get(url.as_str()) else {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_HTTP_RESPONSE_CODE_FAILURE".to_string(),
            });
        };
        if script.lose_session {
            self.session_lost = true;
            return Err(BrowserError::SessionLost("browser crashed".to_string()));
        }
        if script.fail_navigation {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        check_response_status(url, Some(script.http_status.unwrap_or(200)))?;
        self.flaky_clicks_left = script.flaky_clicks;
        self.flaky_waits_left = script.flaky_waits;
        self.clicks_on_page = 0;
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<Presence, BrowserError> {
        self.waits += 1;
        if self.flaky_waits_left > 0 {
            self.flaky_waits_left -= 1;
            return Err(BrowserError::Evaluation(
                "Execution context was destroyed".to_string(),
            ));
        }
        if self.control_present()? {
            Ok(Presence::Found)
        } else {
            Ok(Presence::Absent)
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.click_attempts += 1;
        if self.flaky_clicks_left > 0 {
            self.flaky_clicks_left -= 1;
            return Err(BrowserError::Interaction {
                selector: selector.to_string(),
                reason: "Node is detached from document".to_string(),
            });
        }
        if !self.control_present()? {
            return Err(BrowserError::Interaction {
                selector: selector.to_string(),
                reason: "no node found for selector".to_string(),
            });
        }
        self.clicks_on_page += 1;
        self.clicks += 1;
        if let Some((after, token)) = &self.cancel_after {
            if self.clicks >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn settle(&mut self, _pause: Duration) {}

    async fn html(&mut self) -> Result<String, BrowserError> {
        let script = self.script()?;
        let mut body = script.initial.clone();
        for chunk in script.revealed.iter().take(self.clicks_on_page) {
            body.push_str(chunk);
        }
        self.html_reads.push(self.clicks_on_page);
        Ok(format!("<html><body>{}</body></html>", body))
    }
}

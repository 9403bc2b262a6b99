//! Exponential backoff around flaky page interactions.
//!
//! [`RetryingPage`] wraps any [`ArchivePage`] and transparently retries
//! transient faults (see [`BrowserError::is_transient`]) of `wait_for` and
//! `click`. Navigation and DOM serialization are passed straight through:
//! a failed page load is not something a retry on the same page fixes.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```

use super::{ArchivePage, BrowserError, Presence};
use rand::{Rng, rng};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};
use url::Url;

/// How many times, and how patiently, to retry a transient fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero disables retrying.
    pub max_retries: usize,
    /// Delay before the first retry, doubled on each further attempt.
    pub base_delay: Duration,
    /// Cap on the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), jitter excluded.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng().random_range(0..=max_ms))
        }
    }
}

/// Decorator that retries transient faults of the wrapped page.
pub struct RetryingPage<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> RetryingPage<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    /// Decide whether `err` on attempt `attempt` earns another try, sleeping
    /// through the backoff if it does.
    async fn back_off(&self, op: &str, attempt: usize, err: &BrowserError) -> bool {
        if !err.is_transient() {
            return false;
        }
        if attempt > self.policy.max_retries {
            error!(
                op,
                attempt,
                max = self.policy.max_retries,
                error = %err,
                "Transient fault persisted; giving up"
            );
            return false;
        }
        let delay = self.policy.backoff(attempt) + self.policy.jitter();
        warn!(
            op,
            attempt,
            max = self.policy.max_retries,
            ?delay,
            error = %err,
            "Transient fault; backing off"
        );
        if !delay.is_zero() {
            sleep(delay).await;
        }
        true
    }
}

impl<P> fmt::Debug for RetryingPage<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingPage")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<P: ArchivePage> ArchivePage for RetryingPage<P> {
    async fn goto(&mut self, url: &Url) -> Result<(), BrowserError> {
        self.inner.goto(url).await
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Presence, BrowserError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.wait_for(selector, timeout).await {
                Ok(presence) => return Ok(presence),
                Err(e) => {
                    attempt += 1;
                    if !self.back_off("wait_for", attempt, &e).await {
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.click(selector).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if !self.back_off("click", attempt, &e).await {
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn settle(&mut self, pause: Duration) {
        self.inner.settle(pause).await
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        self.inner.html().await
    }
}

//! Harvest configuration: built-in defaults, an optional YAML file, and CLI
//! overrides, resolved in that order into [`HarvestSettings`].
//!
//! # File format
//!
//! Every key is optional; omitted keys keep their defaults.
//!
//! ```yaml
//! publication: The Verge
//! base_url: https://www.theverge.com/archives
//! start: 2022-01
//! output_dir: ./out
//! on_period_failure: skip
//! layout:
//!   load_more: .c-archives-load-more__button
//!   container: .c-entry-box--compact__body
//! timing:
//!   wait_timeout_ms: 5000
//!   max_expansions: 500
//! ```

use crate::browser::retry::RetryPolicy;
use crate::cli::Cli;
use crate::crawler::CrawlSettings;
use crate::extractor::ArticleSelectors;
use crate::models::Period;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid base URL `{url}`: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid CSS selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("max_expansions must be at least 1")]
    ZeroExpansions,
}

/// What a fatal fault in one period does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the period as skipped and move on to the next one.
    #[default]
    Skip,
    /// Stop the run and exit with an error.
    Abort,
}

/// CSS selectors describing the archive page markup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveLayout {
    pub load_more: String,
    pub container: String,
    pub title: String,
    pub link: String,
    pub time: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            load_more: ".c-archives-load-more__button".to_string(),
            container: ".c-entry-box--compact__body".to_string(),
            title: ".c-entry-box--compact__title".to_string(),
            link: "a".to_string(),
            time: "time".to_string(),
        }
    }
}

/// Waits, pauses and limits of the expansion loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// How long to wait for the load-more control before calling the listing exhausted.
    pub wait_timeout_ms: u64,
    /// Pause after each click.
    pub settle_ms: u64,
    /// Load-more clicks allowed per period.
    pub max_expansions: usize,
    /// Retries for a failed click or probe.
    pub click_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 5000,
            settle_ms: 1000,
            max_expansions: 500,
            click_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// Raw, unvalidated configuration as read from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    pub publication: String,
    pub base_url: String,
    pub start: Period,
    /// Last period to crawl; the current month when unset.
    pub end: Option<Period>,
    pub output_dir: String,
    pub headless: bool,
    pub dedupe: bool,
    pub on_period_failure: FailurePolicy,
    pub layout: ArchiveLayout,
    pub timing: Timing,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            publication: "The Verge".to_string(),
            base_url: "https://www.theverge.com/archives".to_string(),
            start: Period::new(2022, 1).unwrap_or_else(Period::current),
            end: None,
            output_dir: ".".to_string(),
            headless: true,
            dedupe: true,
            on_period_failure: FailurePolicy::Skip,
            layout: ArchiveLayout::default(),
            timing: Timing::default(),
        }
    }
}

/// Everything the pipeline needs, validated and compiled.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub publication: String,
    pub base_url: Url,
    pub start: Period,
    pub end: Option<Period>,
    pub output_dir: String,
    pub headless: bool,
    pub dedupe: bool,
    pub on_period_failure: FailurePolicy,
    pub crawl: CrawlSettings,
    pub retry: RetryPolicy,
    pub selectors: ArticleSelectors,
}

impl HarvestConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load the file at `path`, or the defaults when there is none.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&yaml, path)?;
        info!(path, "Loaded configuration file");
        Ok(config)
    }

    /// Let explicit command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(start) = cli.start {
            self.start = start;
        }
        if let Some(end) = cli.end {
            self.end = Some(end);
        }
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(policy) = cli.on_period_failure {
            self.on_period_failure = policy;
        }
        if let Some(max) = cli.max_expansions {
            self.timing.max_expansions = max;
        }
        if cli.keep_duplicates {
            self.dedupe = false;
        }
        if cli.headful {
            self.headless = false;
        }
    }

    /// Validate and compile into [`HarvestSettings`].
    pub fn resolve(self) -> Result<HarvestSettings, ConfigError> {
        let base_url = Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if self.timing.max_expansions == 0 {
            return Err(ConfigError::ZeroExpansions);
        }
        let selectors = ArticleSelectors::compile(&self.layout)?;
        // Checked here so a typo fails at startup rather than on the first probe.
        ArticleSelectors::check(&self.layout.load_more)?;

        let crawl = CrawlSettings {
            load_more_selector: self.layout.load_more.clone(),
            wait_timeout: Duration::from_millis(self.timing.wait_timeout_ms),
            settle: Duration::from_millis(self.timing.settle_ms),
            max_expansions: self.timing.max_expansions,
        };
        let retry = RetryPolicy {
            max_retries: self.timing.click_retries,
            base_delay: Duration::from_millis(self.timing.retry_base_delay_ms),
            ..RetryPolicy::default()
        };

        Ok(HarvestSettings {
            publication: self.publication,
            base_url,
            start: self.start,
            end: self.end,
            output_dir: self.output_dir,
            headless: self.headless,
            dedupe: self.dedupe,
            on_period_failure: self.on_period_failure,
            crawl,
            retry,
            selectors,
        })
    }
}

//! Data models for archive periods and harvested articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Period`]: One calendar month of the publication's archive
//! - [`ArticleRecord`]: A single article listing extracted from an archive page
//!
//! Records serialize with the `title`, `url` and `date` keys used by the
//! `articles.json` artifact.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// One calendar month of the archive, the unit of pagination.
///
/// Field order matters: the derived ordering compares `year` first and then
/// `month`, which is chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    /// Calendar month, 1 through 12.
    month: u32,
}

/// Error returned when a `YYYY-MM` period string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid period `{input}`: expected YYYY-MM with a month between 1 and 12")]
pub struct PeriodParseError {
    input: String,
}

impl Period {
    /// Build a period, returning `None` when `month` is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing the local wall-clock time right now.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Number of months from `self` to `other`; negative when `other` is earlier.
    pub fn months_until(&self, other: &Period) -> i64 {
        (i64::from(other.year) - i64::from(self.year)) * 12 + i64::from(other.month)
            - i64::from(self.month)
    }

    /// Archive page for this period, `{base}/{year}/{month}` with an unpadded month.
    pub fn archive_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let base = base.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}/{}", base, self.year, self.month))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PeriodParseError {
            input: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        Period::new(year, month).ok_or_else(err)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// A single article listing harvested from an archive page.
///
/// Records are created by the extractor and never mutated afterwards. Two
/// records with the same `url` describe the same article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Headline text, trimmed and never empty.
    pub title: String,
    /// Absolute link to the article.
    pub url: String,
    /// Publication timestamp, `null` in JSON when absent or unparsable.
    #[serde(rename = "date")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Parse the `datetime` attribute of an archive `<time>` element.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` timestamp (read as UTC) and
/// a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

//! Article extraction from a fully expanded archive page.
//!
//! The page's live DOM is serialized inside the browser and parsed here with
//! `scraper`. Each article container is extracted independently: a container
//! missing its title or link yields a [`StructuralFault`] for that item and
//! extraction carries on with the next one.

use crate::config::{ArchiveLayout, ConfigError};
use crate::models::{ArticleRecord, parse_published_at};
use crate::utils::normalize_whitespace;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Compiled selectors for the archive markup.
#[derive(Debug, Clone)]
pub struct ArticleSelectors {
    container: Selector,
    title: Selector,
    link: Selector,
    time: Selector,
}

impl ArticleSelectors {
    pub fn compile(layout: &ArchiveLayout) -> Result<Self, ConfigError> {
        Ok(Self {
            container: parse_selector(&layout.container)?,
            title: parse_selector(&layout.title)?,
            link: parse_selector(&layout.link)?,
            time: parse_selector(&layout.time)?,
        })
    }

    /// Validate a selector without keeping it.
    pub fn check(selector: &str) -> Result<(), ConfigError> {
        parse_selector(selector).map(|_| ())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Why a single container produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    #[error("no title element")]
    MissingTitle,
    #[error("title element has no text")]
    EmptyTitle,
    #[error("no link element")]
    MissingLink,
    #[error("link element has no href")]
    MissingHref,
    #[error("unusable link `{href}`: {reason}")]
    InvalidUrl { href: String, reason: String },
}

/// A container skipped because its markup lacked a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("item {index}: {kind}")]
pub struct StructuralFault {
    /// Position of the container in document order.
    pub index: usize,
    pub kind: FaultKind,
}

/// Records and skipped items from one page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<ArticleRecord>,
    pub faults: Vec<StructuralFault>,
}

/// Extract every article container in `html`.
///
/// # Arguments
///
/// * `html` - Serialized DOM of a fully expanded archive page
/// * `page_url` - Address of that page; relative links are resolved against it
/// * `selectors` - Container and field selectors
///
/// # Returns
///
/// Records in document order, plus one [`StructuralFault`] for every
/// container that could not produce a record.
pub fn extract(html: &str, page_url: &Url, selectors: &ArticleSelectors) -> Extraction {
    let document = Html::parse_document(html);
    let (records, faults): (Vec<_>, Vec<_>) = document
        .select(&selectors.container)
        .enumerate()
        .map(|(index, container)| extract_item(container, index, page_url, selectors))
        .partition_result();
    Extraction { records, faults }
}

fn extract_item(
    container: ElementRef<'_>,
    index: usize,
    page_url: &Url,
    selectors: &ArticleSelectors,
) -> Result<ArticleRecord, StructuralFault> {
    let fault = |kind| StructuralFault { index, kind };

    let title_el = container
        .select(&selectors.title)
        .next()
        .ok_or_else(|| fault(FaultKind::MissingTitle))?;
    let title = normalize_whitespace(&title_el.text().collect::<String>());
    if title.is_empty() {
        return Err(fault(FaultKind::EmptyTitle));
    }

    let link = container
        .select(&selectors.link)
        .next()
        .ok_or_else(|| fault(FaultKind::MissingLink))?;
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| fault(FaultKind::MissingHref))?;
    let url = resolve_link(page_url, href).map_err(|reason| {
        fault(FaultKind::InvalidUrl {
            href: href.to_string(),
            reason,
        })
    })?;

    let published_at = container
        .select(&selectors.time)
        .next()
        .and_then(|time| time.value().attr("datetime"))
        .and_then(|raw| {
            let parsed = parse_published_at(raw);
            if parsed.is_none() {
                debug!(index, raw, "Unparsable datetime attribute");
            }
            parsed
        });

    Ok(ArticleRecord {
        title,
        url: url.to_string(),
        published_at,
    })
}

fn resolve_link(page_url: &Url, href: &str) -> Result<Url, String> {
    let url = page_url.join(href.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme `{}`", other)),
    }
}

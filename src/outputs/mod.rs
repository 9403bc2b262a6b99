//! Output generation for the harvested collection.
//!
//! Two artifacts are produced from the same ordered collection:
//!
//! - [`html`]: `articles.html`, a browsable page of links and dates
//! - [`json`]: `articles.json`, the lossless, re-ingestible record
//!
//! Artifacts are handed to an [`ArtifactSink`]. Both writes are always
//! attempted and every failure is reported, so a successful JSON write can
//! never hide a failed HTML write (or the other way around).
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── articles.html
//! └── articles.json
//! ```

use crate::models::ArticleRecord;
use itertools::Itertools;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

pub mod html;
pub mod json;

pub const HTML_ARTIFACT: &str = "articles.html";
pub const JSON_ARTIFACT: &str = "articles.json";

/// Destination for named text artifacts, overwriting any previous content.
pub trait ArtifactSink {
    async fn persist(&self, name: &str, contents: &str) -> std::io::Result<()>;
}

/// Writes artifacts as files under one directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for FsSink {
    async fn persist(&self, name: &str, contents: &str) -> std::io::Result<()> {
        fs::write(self.dir.join(name), contents).await
    }
}

/// Failure of a single artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to write {name}: {source}")]
    Write {
        name: &'static str,
        source: std::io::Error,
    },
}

/// Every artifact failure from one [`write`] call.
#[derive(Debug, Error)]
#[error("failed to write output artifacts: {}", summarize(.failures))]
pub struct OutputError {
    pub failures: Vec<ArtifactError>,
}

fn summarize(failures: &[ArtifactError]) -> String {
    failures.iter().map(ToString::to_string).join("; ")
}

/// Render both artifacts and persist them through `sink`.
///
/// # Arguments
///
/// * `articles` - The ordered collection
/// * `heading` - Title of the HTML listing
/// * `sink` - Where the artifacts are stored
///
/// # Returns
///
/// The names of the artifacts written. Both artifacts are always attempted;
/// if either fails, an [`OutputError`] lists every failure.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn write<S: ArtifactSink>(
    articles: &[ArticleRecord],
    heading: &str,
    sink: &S,
) -> Result<Vec<&'static str>, OutputError> {
    let mut failures = Vec::new();
    let mut rendered = vec![(HTML_ARTIFACT, html::render(articles, heading))];
    match json::render(articles) {
        Ok(body) => rendered.push((JSON_ARTIFACT, body)),
        Err(source) => failures.push(ArtifactError::Serialize {
            name: JSON_ARTIFACT,
            source,
        }),
    }

    let mut written = Vec::new();
    for (name, body) in rendered {
        match sink.persist(name, &body).await {
            Ok(()) => {
                info!(artifact = name, bytes = body.len(), "Wrote artifact");
                written.push(name);
            }
            Err(source) => {
                error!(artifact = name, error = %source, "Failed writing artifact");
                failures.push(ArtifactError::Write { name, source });
            }
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(OutputError { failures })
    }
}

/// In-memory sink that can be told to fail specific artifacts.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    files: std::sync::Mutex<std::collections::HashMap<String, String>>,
    failing: Vec<String>,
}

#[cfg(test)]
impl MemorySink {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

#[cfg(test)]
impl ArtifactSink for MemorySink {
    async fn persist(&self, name: &str, contents: &str) -> std::io::Result<()> {
        if self.failing.iter().any(|n| n == name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            ));
        }
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

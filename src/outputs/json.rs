//! JSON serialization of the harvested collection.
//!
//! The document is a pretty-printed array; each element carries `title`,
//! `url` and `date` (RFC 3339 or `null`).
//!
//! ```text
//! [
//!   {
//!     "title": "…",
//!     "url": "https://…",
//!     "date": "2023-05-01T17:00:00Z"
//!   }
//! ]
//! ```

use crate::models::ArticleRecord;

/// Serialize `articles` with two-space indentation.
pub fn render(articles: &[ArticleRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(articles)
}

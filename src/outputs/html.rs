//! Browsable HTML listing of the harvested articles.
//!
//! One `<div class="article">` per record, in collection order, holding a
//! link to the article and its publication date.

use crate::models::ArticleRecord;
use crate::utils::escape_html;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

const STYLE: &str = "\
      body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
      a { color: #333; text-decoration: none; }
      a:hover { text-decoration: underline; }
      .article { margin-bottom: 15px; }
      .date { color: #666; font-size: 0.9em; }
";

/// Human-readable date cell contents; never fails on a missing date.
pub fn display_date(published_at: Option<&DateTime<Utc>>) -> String {
    match published_at {
        Some(dt) => format!(
            r#"<time datetime="{}">{}</time>"#,
            dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            dt.format("%B %-d, %Y")
        ),
        None => "Date unknown".to_string(),
    }
}

/// Render the full HTML document with `heading` as title and `<h1>`.
pub fn render(articles: &[ArticleRecord], heading: &str) -> String {
    let heading = escape_html(heading);
    let mut html = String::new();

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <title>{heading}</title>\n    <style>\n{STYLE}    </style>\n  </head>\n  <body>\n    <h1>{heading}</h1>\n"
    );
    for article in articles {
        let _ = write!(
            html,
            "    <div class=\"article\">\n      <a href=\"{}\">{}</a>\n      <div class=\"date\">{}</div>\n    </div>\n",
            escape_html(&article.url),
            escape_html(&article.title),
            display_date(article.published_at.as_ref())
        );
    }
    html.push_str("  </body>\n</html>\n");
    html
}

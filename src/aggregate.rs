//! Merging per-period batches into the final, canonically ordered collection.
//!
//! Canonical order is newest first. `Option<DateTime>` orders `None` below
//! every timestamp, so sorting descending puts undated records last. The sort
//! is stable: records with equal timestamps keep their arrival order.

use crate::models::ArticleRecord;
use itertools::Itertools;

/// Aggregated collection plus how many duplicates were dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub articles: Vec<ArticleRecord>,
    pub duplicates_dropped: usize,
}

/// Concatenate `batches` in arrival order, optionally keep only the first
/// record per URL, then sort newest first.
///
/// # Arguments
///
/// * `batches` - Per-period record lists, in the order periods were crawled
/// * `dedupe` - Drop every record whose URL was already seen
///
/// # Returns
///
/// The ordered collection and the number of records dropped as duplicates.
pub fn aggregate<I>(batches: I, dedupe: bool) -> Aggregate
where
    I: IntoIterator<Item = Vec<ArticleRecord>>,
{
    let merged: Vec<ArticleRecord> = batches.into_iter().flatten().collect();
    let before = merged.len();

    let mut articles: Vec<ArticleRecord> = if dedupe {
        merged.into_iter().unique_by(|a| a.url.clone()).collect()
    } else {
        merged
    };
    let duplicates_dropped = before - articles.len();

    sort_canonical(&mut articles);
    Aggregate {
        articles,
        duplicates_dropped,
    }
}

/// Stable sort by publication time, newest first, undated last.
pub fn sort_canonical(articles: &mut [ArticleRecord]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_published_at;

    fn rec(title: &str, url: &str, date: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            url: url.to_string(),
            published_at: date.and_then(parse_published_at),
        }
    }

    fn titles(articles: &[ArticleRecord]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_sorts_newest_first_across_batches() {
        let batches = vec![
            vec![
                rec("mar", "https://e.com/mar", Some("2023-03-01")),
                rec("may", "https://e.com/may", Some("2023-05-01")),
            ],
            vec![rec("apr", "https://e.com/apr", Some("2023-04-01"))],
        ];
        let result = aggregate(batches, true);
        assert_eq!(titles(&result.articles), vec!["may", "apr", "mar"]);
        assert_eq!(result.duplicates_dropped, 0);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let batches = vec![
            vec![
                rec("a", "https://e.com/a", Some("2023-05-01")),
                rec("b", "https://e.com/b", Some("2023-05-01")),
            ],
            vec![rec("c", "https://e.com/c", Some("2023-05-01"))],
        ];
        let result = aggregate(batches, false);
        assert_eq!(titles(&result.articles), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_undated_records_sort_last_in_arrival_order() {
        let batches = vec![vec![
            rec("undated-1", "https://e.com/u1", None),
            rec("old", "https://e.com/old", Some("2020-01-01")),
            rec("undated-2", "https://e.com/u2", Some("garbage")),
            rec("new", "https://e.com/new", Some("2024-01-01")),
        ]];
        let result = aggregate(batches, false);
        assert_eq!(
            titles(&result.articles),
            vec!["new", "old", "undated-1", "undated-2"]
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let batches = vec![vec![
            rec("x", "https://e.com/x", Some("2022-02-02")),
            rec("y", "https://e.com/y", None),
            rec("z", "https://e.com/z", Some("2023-03-03")),
            rec("w", "https://e.com/w", Some("2022-02-02")),
        ]];
        let once = aggregate(batches, false).articles;
        let mut twice = once.clone();
        sort_canonical(&mut twice);
        assert_eq!(once, twice);
        assert_eq!(aggregate(vec![once.clone()], false).articles, once);
    }

    #[test]
    fn test_dedupe_keeps_first_arrival() {
        let batches = vec![
            vec![rec("first", "https://e.com/dup", Some("2023-01-31"))],
            vec![
                rec("second", "https://e.com/dup", Some("2023-02-01")),
                rec("other", "https://e.com/other", Some("2023-02-02")),
            ],
        ];
        let deduped = aggregate(batches.clone(), true);
        assert_eq!(titles(&deduped.articles), vec!["other", "first"]);
        assert_eq!(deduped.duplicates_dropped, 1);

        let kept = aggregate(batches, false);
        assert_eq!(kept.articles.len(), 3);
        assert_eq!(kept.duplicates_dropped, 0);
    }

    #[test]
    fn test_empty_batches() {
        let result = aggregate(Vec::<Vec<ArticleRecord>>::new(), true);
        assert!(result.articles.is_empty());
    }
}

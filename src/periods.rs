//! Enumeration of the archive months to crawl.

use crate::models::Period;
use std::iter;

/// Every calendar month from `start` through `end`, inclusive and ascending.
///
/// Returns an empty sequence when `start` is after `end`.
pub fn enumerate(start: Period, end: Period) -> Vec<Period> {
    let months = start.months_until(&end) + 1;
    if months <= 0 {
        return Vec::new();
    }
    iter::successors(Some(start), |p| Some(p.succ()))
        .take(months as usize)
        .collect()
}

/// Months from `start` through the current month.
pub fn through_current(start: Period) -> Vec<Period> {
    enumerate(start, Period::current())
}

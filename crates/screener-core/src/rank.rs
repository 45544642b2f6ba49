//! Ordering of accepted results.

use std::cmp::Ordering;

use crate::types::ScreenResult;

/// Sorts results by ROIC, highest first.
///
/// The sort is stable: rows with equal ROIC keep their fetch order. Rows
/// without a ROIC value sort last.
#[must_use]
pub fn rank(mut results: Vec<ScreenResult>) -> Vec<ScreenResult> {
    results.sort_by(|a, b| match (a.snapshot.roic, b.snapshot.roic) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    results
}

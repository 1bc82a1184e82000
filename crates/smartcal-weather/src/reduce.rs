//! Reduction of 3-hour forecast slots to one entry per day.

use std::collections::HashSet;

use crate::types::{DailyForecast, ForecastEntry};

/// Keep the first daytime entry for each calendar date, in input order.
///
/// Night entries are skipped, so a date with only night slots does not
/// appear in the result.
pub fn reduce_to_daily(entries: &[ForecastEntry]) -> Vec<DailyForecast> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| entry.is_daytime())
        .filter(|entry| seen.insert(entry.at.date()))
        .map(DailyForecast::from)
        .collect()
}

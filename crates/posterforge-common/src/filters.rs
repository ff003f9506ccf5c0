//! Mapping of library filters to media-server query pairs.

use chrono::{DateTime, Duration, Months, Utc};

use crate::config::LibraryFilters;

/// Query key for the "added after" filter.
pub const ADDED_AT_KEY: &str = "addedAt>";

/// Build the `(name, value)` query pairs for `filters`.
///
/// Empty filters produce no pair at all.
pub fn query_pairs(filters: &LibraryFilters, now: DateTime<Utc>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if !filters.years.is_empty() {
        let years: Vec<String> = filters.years.iter().map(u32::to_string).collect();
        pairs.push(("year".to_string(), years.join(",")));
    }
    if !filters.titles.is_empty() {
        pairs.push(("title".to_string(), filters.titles.join(",")));
    }
    if !filters.genres.is_empty() {
        pairs.push(("genre".to_string(), filters.genres.join(",")));
    }

    let added = added_at_value(&filters.added_at, now);
    if !added.is_empty() {
        pairs.push((ADDED_AT_KEY.to_string(), added));
    }

    pairs
}

/// Resolve `last_<N>_<days|months|years>` to unix seconds relative to `now`.
///
/// Anything else, including a zero count, yields an empty string.
pub fn added_at_value(window: &str, now: DateTime<Utc>) -> String {
    added_after(window, now)
        .map(|t| t.timestamp().to_string())
        .unwrap_or_default()
}

/// The instant described by `last_<N>_<unit>`, if `window` is well formed.
pub fn added_after(window: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let rest = window.trim().strip_prefix("last_")?;
    let (count, unit) = rest.split_once('_')?;
    let n: u32 = count.parse().ok()?;
    if n == 0 {
        return None;
    }

    match unit {
        "day" | "days" => now.checked_sub_signed(Duration::days(i64::from(n))),
        "month" | "months" => now.checked_sub_months(Months::new(n)),
        "year" | "years" => now.checked_sub_months(Months::new(n.checked_mul(12)?)),
        _ => None,
    }
}

//! Document type matching against the configured category filters.

use crate::config::MatchMode;

/// Returns `true` if `label` matches any of `filters` under `mode`.
///
/// Both sides are compared case-insensitively. In [`MatchMode::Substring`]
/// a filter matches when it occurs anywhere in the label; in
/// [`MatchMode::Exact`] the whole label must equal the filter.
pub fn matches(label: &str, filters: &[String], mode: MatchMode) -> bool {
    category_of(label, filters, mode).is_some()
}

/// The first filter (in configured order) that `label` matches.
///
/// A label matching several filters is attributed to the earliest one.
pub fn category_of<'a>(label: &str, filters: &'a [String], mode: MatchMode) -> Option<&'a str> {
    let label = label.to_lowercase();
    filters
        .iter()
        .find(|filter| {
            let filter = filter.to_lowercase();
            match mode {
                MatchMode::Substring => label.contains(&filter),
                MatchMode::Exact => label == filter,
            }
        })
        .map(String::as_str)
}

//! Sorting for aggregated search results.
//!
//! Supports the view-level sort keys: file name, match count and modification
//! time, plus the default arrival order that preserves progressive discovery.

use std::cmp::Ordering;
use std::time::SystemTime;

use super::types::SearchResult;

/// Sort criterion for aggregated results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Arrival (settlement) order - first-discovered file first.
    Default,
    /// Lexicographic on file name.
    Name,
    /// By match count.
    Matches,
    /// By last modified time.
    Mtime,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Direction applied automatically when the sort key changes; the user can
/// override it afterwards.
pub fn default_direction(key: SortKey) -> SortDirection {
    match key {
        SortKey::Default | SortKey::Name => SortDirection::Ascending,
        SortKey::Matches | SortKey::Mtime => SortDirection::Descending,
    }
}

/// Sort results in place by the given key and direction.
///
/// A missing `modified` timestamp sorts as the epoch, so never-stamped files
/// land together at the old end rather than interleaving.
pub fn sort_results(results: &mut [SearchResult], key: SortKey, direction: SortDirection) {
    if matches!(key, SortKey::Default) {
        if direction == SortDirection::Descending {
            results.reverse();
        }
        return;
    }

    results.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => a.file_name.cmp(&b.file_name),
            SortKey::Matches => a.matches.len().cmp(&b.matches.len()),
            SortKey::Mtime => mtime_or_epoch(a).cmp(&mtime_or_epoch(b)),
            SortKey::Default => Ordering::Equal,
        };

        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

fn mtime_or_epoch(result: &SearchResult) -> SystemTime {
    result.modified.unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::FileMatch;
    use std::time::Duration;

    fn result(path: &str, match_count: usize, modified: Option<SystemTime>) -> SearchResult {
        let matches = (0..match_count)
            .map(|i| FileMatch {
                line: Some(i as u32 + 1),
                content: format!("line {i}"),
            })
            .collect();
        SearchResult::new(path, matches, modified)
    }

    #[test]
    fn sort_by_name_ascending() {
        let mut results = vec![
            result("/p/c.rs", 1, None),
            result("/p/a.rs", 1, None),
            result("/p/b.rs", 1, None),
        ];

        sort_results(&mut results, SortKey::Name, SortDirection::Ascending);

        assert_eq!(results[0].file_name, "a.rs");
        assert_eq!(results[1].file_name, "b.rs");
        assert_eq!(results[2].file_name, "c.rs");
    }

    #[test]
    fn sort_by_name_descending() {
        let mut results = vec![
            result("/p/a.rs", 1, None),
            result("/p/c.rs", 1, None),
            result("/p/b.rs", 1, None),
        ];

        sort_results(&mut results, SortKey::Name, SortDirection::Descending);

        assert_eq!(results[0].file_name, "c.rs");
        assert_eq!(results[1].file_name, "b.rs");
        assert_eq!(results[2].file_name, "a.rs");
    }

    #[test]
    fn sort_by_match_count() {
        let mut results = vec![
            result("/p/one.rs", 1, None),
            result("/p/five.rs", 5, None),
            result("/p/three.rs", 3, None),
        ];

        sort_results(&mut results, SortKey::Matches, SortDirection::Descending);

        assert_eq!(results[0].file_name, "five.rs");
        assert_eq!(results[1].file_name, "three.rs");
        assert_eq!(results[2].file_name, "one.rs");
    }

    #[test]
    fn sort_by_mtime_treats_missing_as_epoch() {
        let now = SystemTime::now();
        let old = now.checked_sub(Duration::from_secs(86400)).unwrap_or(now);

        let mut results = vec![
            result("/p/new.rs", 1, Some(now)),
            result("/p/unstamped.rs", 1, None),
            result("/p/old.rs", 1, Some(old)),
        ];

        sort_results(&mut results, SortKey::Mtime, SortDirection::Descending);

        assert_eq!(results[0].file_name, "new.rs");
        assert_eq!(results[1].file_name, "old.rs");
        assert_eq!(results[2].file_name, "unstamped.rs");
    }

    #[test]
    fn default_preserves_arrival_order() {
        let mut results = vec![
            result("/p/z.rs", 1, None),
            result("/p/a.rs", 1, None),
            result("/p/m.rs", 1, None),
        ];

        sort_results(&mut results, SortKey::Default, SortDirection::Ascending);

        assert_eq!(results[0].file_name, "z.rs");
        assert_eq!(results[1].file_name, "a.rs");
        assert_eq!(results[2].file_name, "m.rs");
    }

    #[test]
    fn default_descending_reverses_arrival() {
        let mut results = vec![result("/p/z.rs", 1, None), result("/p/a.rs", 1, None)];

        sort_results(&mut results, SortKey::Default, SortDirection::Descending);

        assert_eq!(results[0].file_name, "a.rs");
        assert_eq!(results[1].file_name, "z.rs");
    }

    #[test]
    fn default_directions_per_key() {
        assert_eq!(default_direction(SortKey::Default), SortDirection::Ascending);
        assert_eq!(default_direction(SortKey::Name), SortDirection::Ascending);
        assert_eq!(default_direction(SortKey::Matches), SortDirection::Descending);
        assert_eq!(default_direction(SortKey::Mtime), SortDirection::Descending);
    }
}

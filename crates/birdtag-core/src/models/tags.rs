//! Tag maps and the arithmetic applied to them.
//!
//! A stored `TagMap` never contains a zero or negative count: every helper that
//! produces one prunes as its last step.

use std::collections::{BTreeMap, BTreeSet};

/// Species name (lowercase) to positive occurrence count.
pub type TagMap = BTreeMap<String, u32>;

/// Signed per-tag adjustments used by merge mutations.
pub type TagDeltas = BTreeMap<String, i64>;

/// Canonical form of a tag name: trimmed and lowercased.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Builds a `TagMap` from raw `(name, count)` pairs.
///
/// Names are normalised, duplicate names are summed, blank names and
/// non-positive totals are dropped.
pub fn tag_map_from_counts<I, S>(counts: I) -> TagMap
where
    I: IntoIterator<Item = (S, i64)>,
    S: AsRef<str>,
{
    let mut summed: BTreeMap<String, i64> = BTreeMap::new();
    for (name, count) in counts {
        let name = normalize_tag(name.as_ref());
        if name.is_empty() {
            continue;
        }
        *summed.entry(name).or_insert(0) += count;
    }
    prune(summed)
}

/// Applies signed deltas to `tags` and prunes every tag that ends at or below zero.
pub fn merge_deltas(tags: &TagMap, deltas: &TagDeltas) -> TagMap {
    let mut working: BTreeMap<String, i64> = tags
        .iter()
        .map(|(name, count)| (name.clone(), i64::from(*count)))
        .collect();

    for (name, delta) in deltas {
        let name = normalize_tag(name);
        if name.is_empty() {
            continue;
        }
        let entry = working.entry(name).or_insert(0);
        *entry = entry.saturating_add(*delta);
    }

    prune(working)
}

/// Removes the listed tag names regardless of their current count.
pub fn clear_tags<'a, I>(tags: &TagMap, names: I) -> TagMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = tags.clone();
    for name in names {
        result.remove(&normalize_tag(name));
    }
    result
}

/// Every `(tag, min_count)` filter is met: a missing tag counts as zero.
pub fn meets_thresholds(tags: &TagMap, filters: &TagMap) -> bool {
    filters
        .iter()
        .all(|(name, min_count)| tags.get(name).copied().unwrap_or(0) >= *min_count)
}

/// At least one of `species` is present in `tags`.
pub fn contains_any(tags: &TagMap, species: &BTreeSet<String>) -> bool {
    species.iter().any(|name| tags.contains_key(name))
}

fn prune(counts: BTreeMap<String, i64>) -> TagMap {
    counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| (name, u32::try_from(count).unwrap_or(u32::MAX)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, u32)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn deltas(pairs: &[(&str, i64)]) -> TagDeltas {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_threshold_requires_every_filter() {
        let record = tags(&[("crow", 3), ("pigeon", 1)]);
        assert!(meets_thresholds(&record, &tags(&[("crow", 2)])));
        assert!(meets_thresholds(&record, &tags(&[("crow", 3), ("pigeon", 1)])));
        assert!(!meets_thresholds(&record, &tags(&[("crow", 4)])));
        assert!(!meets_thresholds(&record, &tags(&[("crow", 1), ("myna", 1)])));
    }

    #[test]
    fn test_threshold_zero_matches_missing_tag() {
        let record = tags(&[("crow", 1)]);
        assert!(meets_thresholds(&record, &tags(&[("eagle", 0)])));
    }

    #[test]
    fn test_contains_any() {
        let species: BTreeSet<String> = ["crow", "myna"].iter().map(|s| s.to_string()).collect();
        assert!(!contains_any(&tags(&[("pigeon", 2)]), &species));
        assert!(contains_any(&tags(&[("myna", 1)]), &species));
    }

    #[test]
    fn test_merge_then_decrement_prunes() {
        let start = TagMap::new();
        let after_add = merge_deltas(&start, &deltas(&[("crow", 2)]));
        assert_eq!(after_add, tags(&[("crow", 2)]));

        let after_first_remove = merge_deltas(&after_add, &deltas(&[("crow", -1)]));
        assert_eq!(after_first_remove, tags(&[("crow", 1)]));

        let after_second_remove = merge_deltas(&after_first_remove, &deltas(&[("crow", -1)]));
        assert!(after_second_remove.is_empty());
    }

    #[test]
    fn test_merge_never_stores_negative_counts() {
        let result = merge_deltas(&tags(&[("crow", 1), ("pigeon", 4)]), &deltas(&[("crow", -5)]));
        assert_eq!(result, tags(&[("pigeon", 4)]));
    }

    #[test]
    fn test_merge_normalizes_delta_names() {
        let result = merge_deltas(&tags(&[("crow", 1)]), &deltas(&[(" Crow ", 2)]));
        assert_eq!(result, tags(&[("crow", 3)]));
    }

    #[test]
    fn test_clear_removes_regardless_of_count() {
        let result = clear_tags(&tags(&[("crow", 9), ("pigeon", 1)]), ["CROW", "eagle"]);
        assert_eq!(result, tags(&[("pigeon", 1)]));
    }

    #[test]
    fn test_tag_map_from_counts_sums_and_drops() {
        let result = tag_map_from_counts(vec![("Crow", 2), ("crow", 1), ("myna", 0), ("", 4)]);
        assert_eq!(result, tags(&[("crow", 3)]));
    }
}

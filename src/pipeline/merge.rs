//! Bounded history merging.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{Item, Record, Snapshot};

/// Merge freshly fetched items into the previous snapshot.
///
/// Records still listed are refreshed in place and keep their first-seen
/// time. Newly observed keys are appended in fetch order, stamped with
/// `now`. Records missing from `new` are carried forward. The result holds
/// unique keys only, at most `history_size` of them, favouring the entries
/// that come last.
pub fn merge(
    previous: &[Record],
    new: &[Item],
    now: DateTime<Utc>,
    history_size: usize,
) -> Snapshot {
    // Last occurrence supplies the fields of a repeated key.
    let latest: HashMap<&str, &Item> = new
        .iter()
        .filter_map(|item| item.key().map(|key| (key, item)))
        .collect();

    let known: HashSet<&str> = previous.iter().map(|r| r.key.as_str()).collect();

    let carried = previous
        .iter()
        .filter(|r| !r.key.is_empty())
        .map(|record| match latest.get(record.key.as_str()) {
            Some(item) => record.refreshed_from(item),
            None => record.clone(),
        });

    let observed = new
        .iter()
        .filter(|item| item.key().is_some_and(|key| !known.contains(key)))
        .filter_map(|item| item.clone().into_record(now));

    let working: Vec<Record> = carried.chain(observed).collect();
    keep_last_unique(working, history_size)
}

/// Keep the last occurrence of each key, at most `limit` keys, in order.
fn keep_last_unique(records: Vec<Record>, limit: usize) -> Snapshot {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<Record> = Vec::with_capacity(limit.min(records.len()));

    for record in records.into_iter().rev() {
        if kept.len() >= limit {
            break;
        }
        if seen.insert(record.key.clone()) {
            kept.push(record);
        }
    }

    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap()
    }

    fn item(key: &str) -> Item {
        Item::new(key, format!("Title {key}"))
    }

    fn record(key: &str, at: DateTime<Utc>) -> Record {
        item(key).into_record(at).unwrap()
    }

    fn keys(snapshot: &[Record]) -> Vec<&str> {
        snapshot.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_worked_example() {
        let now = t(12);
        let prev = vec![record("a", t(0)), record("b", t(1))];
        let new = vec![item("b"), item("c"), item("d")];

        let merged = merge(&prev, &new, now, 3);

        assert_eq!(keys(&merged), vec!["b", "c", "d"]);
        assert_eq!(merged[0].first_seen_at, t(1));
        assert_eq!(merged[1].first_seen_at, now);
        assert_eq!(merged[2].first_seen_at, now);
    }

    #[test]
    fn test_missing_items_are_carried_forward() {
        let prev = vec![record("a", t(0)), record("b", t(1))];
        let new = vec![item("c")];

        let merged = merge(&prev, &new, t(5), 10);

        assert_eq!(keys(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged[0], prev[0]);
    }

    #[test]
    fn test_still_present_items_are_refreshed() {
        let prev = vec![record("a", t(0))];
        let new = vec![item("a").with_price("500 руб.")];

        let merged = merge(&prev, &new, t(9), 10);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].price.as_deref(), Some("500 руб."));
        assert_eq!(merged[0].first_seen_at, t(0));
    }

    #[test]
    fn test_repeated_key_uses_last_occurrence() {
        let new = vec![
            item("a").with_price("1"),
            item("b"),
            item("a").with_price("2"),
        ];

        let merged = merge(&[], &new, t(3), 10);
        assert_eq!(keys(&merged), vec!["b", "a"]);
        assert_eq!(merged[1].price.as_deref(), Some("2"));

        let prev = vec![record("a", t(0))];
        let merged = merge(&prev, &new, t(3), 10);
        assert_eq!(merged[0].price.as_deref(), Some("2"));
        assert_eq!(merged[0].first_seen_at, t(0));
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let prev: Vec<Record> = (0..5).map(|i| record(&format!("p{i}"), t(i))).collect();
        let new = vec![item("n0"), item("n1")];

        let merged = merge(&prev, &new, t(10), 4);

        assert_eq!(keys(&merged), vec!["p3", "p4", "n0", "n1"]);
    }

    #[test]
    fn test_keys_are_unique() {
        let prev = vec![record("a", t(0)), record("b", t(1)), record("a", t(2))];
        let new = vec![item("b"), item("c"), item("c")];

        let merged = merge(&prev, &new, t(5), 100);
        let unique: HashSet<&str> = keys(&merged).into_iter().collect();

        assert_eq!(unique.len(), merged.len());
        assert_eq!(keys(&merged), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_keyless_items_are_dropped() {
        let mut keyless = item("x");
        keyless.key = None;
        let new = vec![keyless, item(""), item("a")];

        assert_eq!(keys(&merge(&[], &new, t(1), 10)), vec!["a"]);
    }

    #[test]
    fn test_idempotent_on_unchanged_fetch() {
        let prev = vec![record("a", t(0)), record("b", t(1))];
        let new = vec![item("b"), item("c")];

        let once = merge(&prev, &new, t(2), 10);
        let twice = merge(&once, &new, t(2) + Duration::hours(1), 10);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_zero_history_is_empty() {
        assert!(merge(&[record("a", t(0))], &[item("b")], t(1), 0).is_empty());
    }
}

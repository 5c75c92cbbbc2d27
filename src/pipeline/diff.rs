//! Change detection between a fresh fetch and the stored history.
//!
//! Only additions matter for notifications: an item is new when its key
//! has never been recorded for the target.

use std::collections::HashSet;

use crate::models::{Item, Record};

/// Items from `new` whose key is absent from `previous`, in fetch order.
///
/// Items without a key are never reported. Repeated keys within `new` are
/// reported once per occurrence.
pub fn detect_added(new: &[Item], previous: &[Record]) -> Vec<Item> {
    let known: HashSet<&str> = previous.iter().map(|r| r.key.as_str()).collect();

    new.iter()
        .filter(|item| item.key().is_some_and(|key| !known.contains(key)))
        .cloned()
        .collect()
}

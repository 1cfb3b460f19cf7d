//! Where a new node goes among its siblings.

use std::cmp::Ordering;

use crate::config::{InsertPolicy, OrderComparator};
use crate::interval::{Interval, TargetInterval};

/// Compute the target interval for a new child of `parent`.
///
/// `siblings` are the parent's direct children ordered by left value, each
/// paired with its order key. They are only consulted for
/// [`InsertPolicy::Alphabetical`].
pub fn compute_placement(
    parent: Interval,
    policy: InsertPolicy,
    siblings: &[(Interval, &str)],
    candidate_key: &str,
    comparator: &OrderComparator,
) -> TargetInterval {
    match policy {
        InsertPolicy::First => first(parent),
        InsertPolicy::Last => last(parent),
        InsertPolicy::Alphabetical => {
            // Land before the first sibling that does not sort below the
            // candidate. A new key goes ahead of existing equal keys.
            let position = siblings.iter().position(|(_, key)| {
                comparator.compare(key, candidate_key) != Ordering::Less
            });
            match position {
                Some(0) => first(parent),
                Some(index) => TargetInterval::after(siblings[index - 1].0.right),
                None if siblings.is_empty() => first(parent),
                None => last(parent),
            }
        }
    }
}

fn first(parent: Interval) -> TargetInterval {
    TargetInterval::after(parent.left)
}

fn last(parent: Interval) -> TargetInterval {
    TargetInterval::at(parent.right)
}

/// A new root goes after everything already in the table.
pub fn root_placement(max_right: i32) -> TargetInterval {
    TargetInterval::after(max_right)
}

//! Direct-child enumeration by interval containment.

use crate::interval::Interval;

/// Keep the rows at depth 1 below the first row (plus the first row itself
/// when `include_self` is set).
///
/// `rows` must be the ancestor followed by everything inside its interval,
/// ordered by left value. Depth is the number of enclosing intervals still
/// open when a row starts.
pub fn direct_children<T, F>(rows: Vec<T>, include_self: bool, interval_of: F) -> Vec<T>
where
    F: Fn(&T) -> Interval,
{
    let mut open: Vec<i32> = Vec::new();
    let mut selected = Vec::new();

    for row in rows {
        let interval = interval_of(&row);
        while open.last().is_some_and(|right| *right < interval.left) {
            open.pop();
        }
        let depth = open.len();
        open.push(interval.right);

        if depth == 1 || (depth == 0 && include_self) {
            selected.push(row);
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<(char, Interval)> {
        vec![
            ('R', Interval::new(1, 12)),
            ('A', Interval::new(2, 3)),
            ('B', Interval::new(4, 9)),
            ('D', Interval::new(5, 6)),
            ('F', Interval::new(7, 8)),
            ('C', Interval::new(10, 11)),
        ]
    }

    fn names(rows: Vec<(char, Interval)>) -> String {
        rows.into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn direct_children_skip_grandchildren() {
        let rows = direct_children(tree(), false, |(_, interval)| *interval);
        assert_eq!(names(rows), "ABC");
    }

    #[test]
    fn include_self_keeps_the_ancestor_first() {
        let rows = direct_children(tree(), true, |(_, interval)| *interval);
        assert_eq!(names(rows), "RABC");
    }

    #[test]
    fn subtree_enumeration() {
        let rows = direct_children(tree()[2..5].to_vec(), false, |(_, interval)| *interval);
        assert_eq!(names(rows), "DF");
    }

    #[test]
    fn leaf_has_no_children() {
        let rows = direct_children(vec![('A', Interval::new(2, 3))], false, |(_, i)| *i);
        assert!(rows.is_empty());
    }
}

//! Interval arithmetic for the nested-set encoding.
//!
//! Everything here is plain data: the repository turns a [`Shift`] or a
//! [`Relocation`] into one bulk SQL statement, and the tests evaluate the same
//! values in memory through [`Shift::apply`] and [`Relocation::apply`].

use std::collections::HashSet;
use std::fmt;

use crate::error::NestedSetError;

/// Amount every interval beyond the pivot grows by when one leaf is inserted.
pub const LEAF_WIDTH: i32 = 2;

/// The `(left, right)` pair stored on every node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Interval {
    pub left: i32,
    pub right: i32,
}

impl Interval {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Interval of a leaf whose left value is `left`.
    pub fn leaf(left: i32) -> Self {
        Self::new(left, left + 1)
    }

    /// `right - left + 1`; always even for a well-formed node.
    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    /// Nodes in the subtree, the node itself included.
    pub fn node_count(&self) -> i32 {
        self.width() / 2
    }

    pub fn descendant_count(&self) -> i32 {
        self.node_count() - 1
    }

    /// A usable pair: `left < right` and an odd difference.
    pub fn is_well_formed(&self) -> bool {
        self.left < self.right && (self.right - self.left) % 2 == 1
    }

    /// Strict containment: `other` is a descendant of `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.left < other.left && other.right < self.right
    }

    pub fn contains_value(&self, value: i32) -> bool {
        self.left <= value && value <= self.right
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.left, self.right)
    }
}

/// One of the two interval columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

/// Comparison against a fixed value selecting the rows a [`Shift`] touches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Threshold {
    /// `value > pivot`
    Above(i32),
    /// `value >= pivot`
    AtLeast(i32),
}

impl Threshold {
    pub fn matches(self, value: i32) -> bool {
        match self {
            Threshold::Above(pivot) => value > pivot,
            Threshold::AtLeast(pivot) => value >= pivot,
        }
    }

    /// First value a new interval may occupy without colliding with the
    /// values this threshold moves out of the way.
    pub fn first_free(self) -> i32 {
        match self {
            Threshold::Above(pivot) => pivot + 1,
            Threshold::AtLeast(pivot) => pivot,
        }
    }
}

/// `side = side + delta WHERE side <threshold>`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Shift {
    pub side: Side,
    pub threshold: Threshold,
    pub delta: i32,
}

impl Shift {
    pub fn new(side: Side, threshold: Threshold, delta: i32) -> Self {
        Self {
            side,
            threshold,
            delta,
        }
    }

    /// Right then left shift sharing a threshold and delta.
    pub fn pair(threshold: Threshold, delta: i32) -> [Shift; 2] {
        [
            Shift::new(Side::Right, threshold, delta),
            Shift::new(Side::Left, threshold, delta),
        ]
    }

    pub fn apply(&self, interval: &mut Interval) {
        let value = match self.side {
            Side::Left => &mut interval.left,
            Side::Right => &mut interval.right,
        };
        if self.threshold.matches(*value) {
            *value += self.delta;
        }
    }
}

/// Where a new leaf goes: every value matching `threshold` moves by `delta`
/// and the leaf takes the two freed values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TargetInterval {
    pub threshold: Threshold,
    pub delta: i32,
}

impl TargetInterval {
    /// Insert right after `pivot`, shifting values strictly greater than it.
    pub fn after(pivot: i32) -> Self {
        Self {
            threshold: Threshold::Above(pivot),
            delta: LEAF_WIDTH,
        }
    }

    /// Insert at `pivot`, shifting values greater than or equal to it. Used to
    /// append a last child, which pushes the parent's own right value outward.
    pub fn at(pivot: i32) -> Self {
        Self {
            threshold: Threshold::AtLeast(pivot),
            delta: LEAF_WIDTH,
        }
    }

    pub fn shifts(&self) -> [Shift; 2] {
        Shift::pair(self.threshold, self.delta)
    }

    pub fn interval(&self) -> Interval {
        Interval::leaf(self.threshold.first_free())
    }
}

/// Case-based offset function that splices a subtree in as the last child of
/// a new parent in a single update.
///
/// Each column of each row is evaluated on its own: values inside `moving`
/// get `moving_offset`, values inside `displaced` get `displaced_offset`,
/// everything else stays put.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Relocation {
    pub moving: Interval,
    pub moving_offset: i32,
    /// Inclusive bounds; empty when `displaced.0 > displaced.1`.
    pub displaced: (i32, i32),
    pub displaced_offset: i32,
    /// Rows with either column inside this inclusive window may change.
    pub window: (i32, i32),
}

impl Relocation {
    /// Plan moving the subtree `current` so that it ends right before
    /// `new_right`, the right value of the new parent.
    pub fn plan(current: Interval, new_right: i32) -> Result<Self, NestedSetError> {
        if !current.is_well_formed() {
            return Err(NestedSetError::invalid_move(format!(
                "subtree interval {current} is not numbered"
            )));
        }
        if current.contains_value(new_right) {
            return Err(NestedSetError::invalid_move(format!(
                "target position {new_right} lies inside the moving subtree {current}"
            )));
        }

        let plan = if new_right < current.left {
            Self {
                moving: current,
                moving_offset: new_right - current.left,
                displaced: (new_right, current.left - 1),
                displaced_offset: current.width(),
                window: (new_right, current.right),
            }
        } else {
            Self {
                moving: current,
                moving_offset: new_right - current.right - 1,
                displaced: (current.right + 1, new_right - 1),
                displaced_offset: current.left - current.right - 1,
                window: (current.left, new_right),
            }
        };
        Ok(plan)
    }

    pub fn offset(&self, value: i32) -> i32 {
        if self.moving.contains_value(value) {
            self.moving_offset
        } else if self.displaced.0 <= value && value <= self.displaced.1 {
            self.displaced_offset
        } else {
            0
        }
    }

    pub fn touches(&self, interval: &Interval) -> bool {
        let (low, high) = self.window;
        (low <= interval.left && interval.left <= high)
            || (low <= interval.right && interval.right <= high)
    }

    pub fn apply(&self, interval: &mut Interval) {
        if self.touches(interval) {
            interval.left += self.offset(interval.left);
            interval.right += self.offset(interval.right);
        }
    }

    /// Interval the moved subtree root ends up with.
    pub fn destination(&self) -> Interval {
        Interval::new(
            self.moving.left + self.moving_offset,
            self.moving.right + self.moving_offset,
        )
    }
}

/// Check a whole table worth of intervals: well-formed pairs, unique
/// endpoints, no partial overlap, and widths that match the number of
/// contained nodes.
pub fn check_forest(intervals: &[Interval]) -> Result<(), NestedSetError> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|interval| interval.left);

    let mut endpoints = HashSet::with_capacity(sorted.len() * 2);
    for interval in &sorted {
        if !interval.is_well_formed() {
            return Err(NestedSetError::corruption(format!(
                "interval {interval} is not well formed"
            )));
        }
        if !endpoints.insert(interval.left) || !endpoints.insert(interval.right) {
            return Err(NestedSetError::corruption(format!(
                "interval {interval} reuses a value held by another node"
            )));
        }
    }

    let mut open: Vec<Interval> = Vec::new();
    for (index, interval) in sorted.iter().enumerate() {
        while open.last().is_some_and(|top| top.right < interval.left) {
            open.pop();
        }
        if let Some(top) = open.last() {
            if interval.right > top.right {
                return Err(NestedSetError::corruption(format!(
                    "interval {interval} partially overlaps {top}"
                )));
            }
        }
        open.push(*interval);

        let end = sorted.partition_point(|other| other.left < interval.right);
        let contained = (end - index) as i32;
        if contained != interval.node_count() {
            return Err(NestedSetError::corruption(format!(
                "interval {interval} spans {} nodes but contains {contained}",
                interval.node_count()
            )));
        }
    }

    Ok(())
}

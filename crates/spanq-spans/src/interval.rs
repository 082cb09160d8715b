//! Half-open token position ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open token-position range `[start, end)` within one document.
///
/// Ordering is by `start`, then `end`, which is the order every occurrence
/// stream yields intervals in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Interval {
    /// First token position covered.
    pub start: u32,
    /// One past the last token position covered.
    pub end: u32,
}

impl Interval {
    /// Creates an interval. `start` must not exceed `end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "interval start {start} after end {end}");
        Self { start, end }
    }

    /// A single-token interval at `position`.
    pub fn token(position: u32) -> Self {
        Self::new(position, position + 1)
    }

    /// Number of tokens covered.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// True for zero-length intervals.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` lies entirely inside this interval.
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_start_then_end() {
        let mut intervals = vec![
            Interval::new(3, 4),
            Interval::new(1, 5),
            Interval::new(1, 2),
            Interval::new(3, 3),
        ];
        intervals.sort();
        assert_eq!(
            intervals,
            vec![
                Interval::new(1, 2),
                Interval::new(1, 5),
                Interval::new(3, 3),
                Interval::new(3, 4),
            ]
        );
    }

    #[test]
    fn containment_includes_equal_bounds() {
        let outer = Interval::new(2, 6);
        assert!(outer.contains(&Interval::new(2, 6)));
        assert!(outer.contains(&Interval::new(4, 4)));
        assert!(!outer.contains(&Interval::new(1, 3)));
    }

    #[test]
    fn token_interval_has_length_one() {
        let t = Interval::token(7);
        assert_eq!(t.len(), 1);
        assert!(!t.is_empty());
        assert_eq!(t.to_string(), "[7, 8)");
    }
}

//! Position ranges and their geometric classification.

use crate::point::Position;

/// A half-open range of document positions, `begin..end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub begin: Position,
    pub end: Position,
}

/// How range `a` relates to range `b` in [`Range::compare`].
///
/// The overlap cases read as "`a` starts ... and ends ..." relative to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRelation {
    /// `a` ends strictly before `b` begins.
    Before,
    /// `a` ends exactly where `b` begins.
    TouchesBefore,
    /// `a` begins strictly after `b` ends.
    After,
    /// `a` begins exactly where `b` ends.
    TouchesAfter,
    /// Same begin and same end.
    Identical,
    StartsBeforeEndsInside,
    StartsBeforeEndsTogether,
    StartsBeforeEndsAfter,
    StartsTogetherEndsInside,
    StartsTogetherEndsAfter,
    StartsInsideEndsInside,
    StartsInsideEndsTogether,
    StartsInsideEndsAfter,
    /// `a` is empty and lies strictly inside `b`.
    PointInside,
}

impl RangeRelation {
    /// True for identical ranges and the eight overlap cases.
    pub fn overlaps(self) -> bool {
        !matches!(
            self,
            RangeRelation::Before
                | RangeRelation::TouchesBefore
                | RangeRelation::After
                | RangeRelation::TouchesAfter
                | RangeRelation::PointInside
        )
    }

    /// True if `a` lies entirely before `b` (possibly touching).
    pub fn is_before(self) -> bool {
        matches!(self, RangeRelation::Before | RangeRelation::TouchesBefore)
    }

    /// True if `a` lies entirely after `b` (possibly touching).
    pub fn is_after(self) -> bool {
        matches!(self, RangeRelation::After | RangeRelation::TouchesAfter)
    }
}

impl Range {
    /// Create a range, swapping the ends if given in reverse order.
    pub fn new(begin: Position, end: Position) -> Self {
        if begin <= end {
            Self { begin, end }
        } else {
            Self {
                begin: end,
                end: begin,
            }
        }
    }

    /// Empty range at `position`.
    pub fn point(position: Position) -> Self {
        Self {
            begin: position,
            end: position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Check if this range contains the given position (`begin <= p < end`).
    pub fn contains(&self, position: Position) -> bool {
        self.begin <= position && position < self.end
    }

    /// Extent covered by the range, see [`Position::extent_of`].
    pub fn extent(&self) -> Position {
        self.end - self.begin
    }

    /// Classify `self` against `other`.
    ///
    /// Checks run in a fixed order so that empty ranges land in exactly one
    /// class: identical, then the disjoint and touching cases, then the
    /// point-inside case, then the overlap grid.
    pub fn compare(&self, other: &Range) -> RangeRelation {
        use std::cmp::Ordering::*;

        let (a, b) = (self, other);
        if a.begin == b.begin && a.end == b.end {
            return RangeRelation::Identical;
        }
        if a.end < b.begin {
            return RangeRelation::Before;
        }
        if a.end == b.begin {
            return RangeRelation::TouchesBefore;
        }
        if a.begin > b.end {
            return RangeRelation::After;
        }
        if a.begin == b.end {
            return RangeRelation::TouchesAfter;
        }
        if a.is_empty() {
            return RangeRelation::PointInside;
        }

        match (a.begin.cmp(&b.begin), a.end.cmp(&b.end)) {
            (Less, Less) => RangeRelation::StartsBeforeEndsInside,
            (Less, Equal) => RangeRelation::StartsBeforeEndsTogether,
            (Less, Greater) => RangeRelation::StartsBeforeEndsAfter,
            (Equal, Less) => RangeRelation::StartsTogetherEndsInside,
            (Equal, Greater) => RangeRelation::StartsTogetherEndsAfter,
            (Greater, Less) => RangeRelation::StartsInsideEndsInside,
            (Greater, Equal) => RangeRelation::StartsInsideEndsTogether,
            (Greater, Greater) => RangeRelation::StartsInsideEndsAfter,
            (Equal, Equal) => RangeRelation::Identical,
        }
    }
}

impl From<std::ops::Range<Position>> for Range {
    fn from(range: std::ops::Range<Position>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(b: usize, e: usize) -> Range {
        Range::new(Position::new(0, b), Position::new(0, e))
    }

    #[test]
    fn disjoint_and_touching() {
        assert_eq!(r(0, 2).compare(&r(3, 5)), RangeRelation::Before);
        assert_eq!(r(0, 3).compare(&r(3, 5)), RangeRelation::TouchesBefore);
        assert_eq!(r(6, 8).compare(&r(3, 5)), RangeRelation::After);
        assert_eq!(r(5, 8).compare(&r(3, 5)), RangeRelation::TouchesAfter);
        assert_eq!(r(3, 5).compare(&r(3, 5)), RangeRelation::Identical);
    }

    #[test]
    fn overlap_grid() {
        let b = r(3, 6);
        assert_eq!(r(1, 4).compare(&b), RangeRelation::StartsBeforeEndsInside);
        assert_eq!(r(1, 6).compare(&b), RangeRelation::StartsBeforeEndsTogether);
        assert_eq!(r(1, 8).compare(&b), RangeRelation::StartsBeforeEndsAfter);
        assert_eq!(r(3, 4).compare(&b), RangeRelation::StartsTogetherEndsInside);
        assert_eq!(r(3, 8).compare(&b), RangeRelation::StartsTogetherEndsAfter);
        assert_eq!(r(4, 5).compare(&b), RangeRelation::StartsInsideEndsInside);
        assert_eq!(r(4, 6).compare(&b), RangeRelation::StartsInsideEndsTogether);
        assert_eq!(r(4, 8).compare(&b), RangeRelation::StartsInsideEndsAfter);
        assert_eq!(r(4, 4).compare(&b), RangeRelation::PointInside);
    }

    #[test]
    fn empty_ranges_at_the_edges_touch() {
        let b = r(3, 6);
        assert_eq!(r(3, 3).compare(&b), RangeRelation::TouchesBefore);
        assert_eq!(r(6, 6).compare(&b), RangeRelation::TouchesAfter);
        assert_eq!(r(3, 6).compare(&r(4, 4)), RangeRelation::StartsBeforeEndsAfter);
    }

    /// Every pair of ranges on a short line lands in a class consistent with
    /// the brute-force character sets.
    #[test]
    fn exhaustive_classification_is_consistent() {
        let n = 6;
        for ab in 0..=n {
            for ae in ab..=n {
                for bb in 0..=n {
                    for be in bb..=n {
                        let (a, b) = (r(ab, ae), r(bb, be));
                        let relation = a.compare(&b);
                        let shared = (ab..ae).any(|c| (bb..be).contains(&c));
                        match relation {
                            RangeRelation::Before => assert!(ae < bb),
                            RangeRelation::TouchesBefore => assert_eq!(ae, bb),
                            RangeRelation::After => assert!(ab > be),
                            RangeRelation::TouchesAfter => assert_eq!(ab, be),
                            RangeRelation::Identical => assert_eq!((ab, ae), (bb, be)),
                            RangeRelation::PointInside => {
                                assert_eq!(ab, ae);
                                assert!(bb < ab && ab < be);
                            },
                            RangeRelation::StartsBeforeEndsAfter if bb == be => {
                                assert!(ab < bb && be < ae, "{a:?} does not surround {b:?}");
                            },
                            _ => assert!(shared, "{relation:?} for {a:?} vs {b:?}"),
                        }
                        if shared {
                            assert!(relation.overlaps(), "{relation:?} for {a:?} vs {b:?}");
                        }
                        let mirrored = b.compare(&a);
                        assert_eq!(relation.is_before(), mirrored.is_after());
                        assert_eq!(
                            relation == RangeRelation::TouchesBefore,
                            mirrored == RangeRelation::TouchesAfter
                        );
                    }
                }
            }
        }
    }
}

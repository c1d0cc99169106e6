//! Document coordinates.
//!
//! A [`Position`] names a character boundary by `(line, column)`, where `column`
//! counts characters (not bytes) from the start of the line. Positions double as
//! *extents*: the size of a piece of text measured in line breaks plus the
//! characters after the last break. Adding an extent to a position gives the
//! position reached after writing that text.

use std::ops::{Add, AddAssign, Sub};

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Extent of `text`: number of line feeds and characters after the last one.
    pub fn extent_of(text: &str) -> Self {
        let mut extent = Self::zero();
        for ch in text.chars() {
            if ch == '\n' {
                extent.line += 1;
                extent.column = 0;
            } else {
                extent.column += 1;
            }
        }
        extent
    }

    /// Position reached after writing `text` starting here.
    pub fn advance(self, text: &str) -> Self {
        self + Self::extent_of(text)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        if other.line == 0 {
            Position {
                line: self.line,
                column: self.column + other.column,
            }
        } else {
            Position {
                line: self.line + other.line,
                column: other.column,
            }
        }
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Extent between two positions, `self >= other`.
///
/// This is the inverse of [`Add`]: `other + (self - other) == self`.
impl Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        debug_assert!(self >= other, "{self} - {other} underflows");
        if self.line == other.line {
            Position {
                line: 0,
                column: self.column.saturating_sub(other.column),
            }
        } else {
            Position {
                line: self.line - other.line,
                column: self.column,
            }
        }
    }
}

/// Byte offset of character `column` in `text`, clamped to the end.
pub(crate) fn byte_index(text: &str, column: usize) -> usize {
    text.char_indices()
        .nth(column)
        .map_or(text.len(), |(index, _)| index)
}

/// Character offset within `text` of the document position `at`, where `text`
/// starts at `origin`. Clamped to the length of `text`.
pub(crate) fn char_offset(text: &str, origin: Position, at: Position) -> usize {
    let mut pos = origin;
    let mut count = 0;
    for ch in text.chars() {
        if pos >= at {
            return count;
        }
        if ch == '\n' {
            pos.line += 1;
            pos.column = 0;
        } else {
            pos.column += 1;
        }
        count += 1;
    }
    count
}

/// Split `text` at a character offset.
pub(crate) fn split_at_char(text: &str, offset: usize) -> (&str, &str) {
    text.split_at(byte_index(text, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_line_major() {
        assert!(Position::new(0, 10) < Position::new(1, 0));
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn extent_counts_line_feeds() {
        assert_eq!(Position::extent_of("abc"), Position::new(0, 3));
        assert_eq!(Position::extent_of("ab\ncd"), Position::new(1, 2));
        assert_eq!(Position::extent_of("\n"), Position::new(1, 0));
        assert_eq!(Position::extent_of(""), Position::zero());
    }

    #[test]
    fn add_and_sub_are_inverse() {
        let base = Position::new(3, 4);
        for extent in [
            Position::new(0, 0),
            Position::new(0, 5),
            Position::new(2, 0),
            Position::new(2, 7),
        ] {
            assert_eq!((base + extent) - base, extent);
        }
    }

    #[test]
    fn advance_over_multiline_text() {
        assert_eq!(Position::new(1, 4).advance("xy"), Position::new(1, 6));
        assert_eq!(Position::new(1, 4).advance("x\nyz"), Position::new(2, 2));
    }

    #[test]
    fn char_offset_walks_lines() {
        let text = "ab\ncd";
        let origin = Position::new(5, 2);
        assert_eq!(char_offset(text, origin, origin), 0);
        assert_eq!(char_offset(text, origin, Position::new(5, 4)), 2);
        assert_eq!(char_offset(text, origin, Position::new(6, 0)), 3);
        assert_eq!(char_offset(text, origin, Position::new(6, 2)), 5);
        assert_eq!(char_offset(text, origin, Position::new(9, 0)), 5);
    }

    #[test]
    fn byte_index_handles_multibyte() {
        assert_eq!(byte_index("héllo", 2), 3);
        assert_eq!(byte_index("héllo", 99), 6);
        assert_eq!(split_at_char("héllo", 2), ("hé", "llo"));
    }
}

//! Visual lines and the elements they are made of.
//!
//! A [`Line`] is one row on screen. It is derived state: the composer rebuilds
//! lines from the document blocks whenever they change, and nothing in a line
//! is ever written back.
//!
//! ```text
//! block 0: "This is a simple document."     (characters_per_line = 12)
//!
//! line 0: [BlockFragment 0..10] [CarriageReturn]
//! line 1: [LineIndent 2] [BlockFragment 10..17] [CarriageReturn]
//! line 2: [LineIndent 2] [BlockFragment 17..26]
//! ```

use smallvec::SmallVec;
use tome_text::BlockId;

/// Identifies a fold registered with a [`crate::Composer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoldId(pub(crate) u64);

/// Identifies a row or inline insert registered with a [`crate::Composer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InsertId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineElement {
    /// Columns `start_column..start_column + length` of `block`. `width` is
    /// the visual width, with tabs expanded for where the fragment starts.
    BlockFragment {
        block: BlockId,
        start_column: usize,
        length: usize,
        width: usize,
    },
    /// Placeholder for a collapsed range.
    Fold { id: FoldId, width: usize },
    /// A row of externally rendered content.
    Insert { id: InsertId, width: usize },
    /// Externally rendered content inside a text line.
    InlineInsert { id: InsertId, width: usize },
    /// The line was wrapped here and continues on the next one.
    CarriageReturn,
    /// Leading indent of a wrapped continuation line.
    LineIndent { width: usize },
}

impl LineElement {
    pub fn width(&self) -> usize {
        match *self {
            LineElement::BlockFragment { width, .. }
            | LineElement::Fold { width, .. }
            | LineElement::Insert { width, .. }
            | LineElement::InlineInsert { width, .. }
            | LineElement::LineIndent { width } => width,
            LineElement::CarriageReturn => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub elements: SmallVec<[LineElement; 4]>,
    /// Total width of the elements.
    pub width: usize,
    /// Block whose line group this line belongs to.
    pub root: BlockId,
    /// Index of this line inside its group, 0 for the first.
    pub wrap_index: usize,
}

impl Line {
    /// True if the line ends in a wrap rather than a line feed.
    pub fn is_wrapped(&self) -> bool {
        matches!(self.elements.last(), Some(LineElement::CarriageReturn))
    }

    /// True if the line is a wrapped continuation of the previous one.
    pub fn is_continuation(&self) -> bool {
        matches!(self.elements.first(), Some(LineElement::LineIndent { .. }))
    }
}

/// A run of characters sharing one format, cut from a
/// [`LineElement::BlockFragment`] by [`crate::Composer::fragments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub format: Option<tome_text::FormatId>,
    pub text: String,
}

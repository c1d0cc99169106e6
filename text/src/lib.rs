//! In-memory text document engine for tome
//!
//! A [`TextDocument`] is a chain of line blocks with a registry of cursors that
//! stay in place as the text changes around them. Edits are grouped into
//! transactions whose net effect is kept as a [`TextDiff`], which is what undo
//! and redo replay.
//!
//! The key components are:
//! - [`Position`] and [`Range`] - line/column coordinates and their 14-way comparison
//! - [`TextDiff`] - merge algebra for insertions and removals
//! - [`TextDocument`] - block chain, cursor bookkeeping, transactions, history, listeners
//! - [`TextCursor`] - movement, selection and editing at a cursor
//! - [`Contributor`] - per-author cursors and undo scope
//! - [`SyntaxHighlighter`] - hook for incremental, state-carrying highlighting

mod arena;
pub mod block;
pub mod contributor;
pub mod cursor;
pub mod diff;
pub mod document;
pub mod error;
pub mod highlight;
pub mod point;
pub mod range;

#[cfg(test)]
mod test_helpers;

pub use arena::{Arena, Handle};
pub use block::{BlockId, FormatId, FormatRange, TextBlock};
pub use contributor::{AuthorId, Contributor};
pub use cursor::{CursorId, MoveMode, MoveOperation, TextCursor};
pub use diff::{Diff, DiffKind, TextDiff, TextRange};
pub use document::{Contribution, DocumentId, DocumentListener, TextDocument};
pub use error::TextError;
pub use highlight::{HighlightContext, SyntaxHighlighter};
pub use point::Position;
pub use range::{Range, RangeRelation};

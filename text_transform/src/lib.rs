//! Visual line layout for tome documents.
//!
//! This crate projects the blocks of a [`tome_text::TextDocument`] into the
//! rows a renderer draws, handling:
//!
//! - **Word wrapping**: lines longer than the configured width continue on
//!   indented rows
//! - **Tabs and wide characters**: measured in columns, not characters
//! - **Folding**: a range collapses into a fixed-width placeholder
//! - **Inserts**: rows or inline gaps reserved for content drawn elsewhere
//!
//! # Architecture
//!
//! ```text
//! TextDocument --(listener callbacks)--> Composer
//!                                          | Layout      (atoms, in position order)
//!                                          | LineBuilder (wrap rules)
//!                                          v
//!                                     Vec<Line> --> renderer
//! ```
//!
//! The composer only ever relays out the line groups touched by a change.
//! Folds and inserts are anchored with document cursors, so they move with
//! the text without the composer tracking edits itself.
//!
//! # Usage
//!
//! ```ignore
//! let mut document = TextDocument::from_text("fn main() {\n    body\n}");
//! let view = TextView::new(&mut document, LayoutConfig::default());
//! view.add_fold(&mut document, Position::new(0, 11), Position::new(2, 0))?;
//! assert_eq!(view.height(), 1);
//! ```
mod composer;
mod config;
mod error;
mod layout;
mod line;
mod view;

#[cfg(test)]
mod test_helpers;

pub use composer::Composer;
pub use config::{LayoutConfig, WrapMode};
pub use error::ComposerError;
pub use line::{FoldId, InsertId, Line, LineElement, StyledRun};
pub use view::TextView;

//! Highlighter hook.
//!
//! The document drives a [`SyntaxHighlighter`] one block at a time through
//! [`crate::TextDocument::rehighlight`]. Each block carries an integer state
//! handed to the next block, so stateful constructs (block comments, strings
//! spanning lines) can be tracked incrementally: a block is revisited only when
//! its revision or its incoming state changed.

use crate::block::{BlockId, FormatId, FormatRange};

pub trait SyntaxHighlighter {
    /// Assign formats to `text`, the content of [`HighlightContext::current_block`].
    fn highlight_block(&mut self, text: &str, context: &mut HighlightContext<'_>);
}

/// Per-block view handed to a [`SyntaxHighlighter`].
pub struct HighlightContext<'a> {
    block: BlockId,
    formats: &'a mut Vec<FormatRange>,
    state: &'a mut i32,
    previous_state: i32,
}

impl<'a> HighlightContext<'a> {
    pub(crate) fn new(
        block: BlockId,
        formats: &'a mut Vec<FormatRange>,
        state: &'a mut i32,
        previous_state: i32,
    ) -> Self {
        Self {
            block,
            formats,
            state,
            previous_state,
        }
    }

    pub fn current_block(&self) -> BlockId {
        self.block
    }

    /// Format `length` characters from `start`. Later calls win where runs
    /// overlap.
    pub fn set_format(&mut self, start: usize, length: usize, format: FormatId) {
        if length == 0 {
            return;
        }
        let end = start + length;
        let mut kept = Vec::with_capacity(self.formats.len() + 2);
        for range in self.formats.drain(..) {
            let range_end = range.start + range.length;
            if range_end <= start || range.start >= end {
                kept.push(range);
                continue;
            }
            if range.start < start {
                kept.push(FormatRange {
                    length: start - range.start,
                    ..range
                });
            }
            if range_end > end {
                kept.push(FormatRange {
                    start: end,
                    length: range_end - end,
                    ..range
                });
            }
        }
        kept.push(FormatRange {
            start,
            length,
            format,
        });
        kept.sort_by_key(|range| range.start);
        *self.formats = kept;
    }

    pub fn block_state(&self) -> i32 {
        *self.state
    }

    pub fn set_block_state(&mut self, state: i32) {
        *self.state = state;
    }

    /// State left by the previous block, `-1` for the first block.
    pub fn previous_block_state(&self) -> i32 {
        self.previous_state
    }
}

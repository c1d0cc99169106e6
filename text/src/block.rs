//! Document blocks.
//!
//! A [`TextBlock`] holds one logical line without its line feed. Blocks are
//! owned by the [`crate::TextDocument`] arena and linked into a chain through
//! [`BlockId`] handles.

use crate::arena::Handle;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle to a block in its document's arena.
pub type BlockId = Handle<TextBlock>;

/// Opaque format identifier assigned by a highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatId(pub u32);

/// A formatted run of characters within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRange {
    pub start: usize,
    pub length: usize,
    pub format: FormatId,
}

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct TextBlock {
    serial: u64,
    pub(crate) content: String,
    /// Cached `content.chars().count()`.
    pub(crate) length: usize,
    pub(crate) revision: u64,
    pub(crate) previous: Option<BlockId>,
    pub(crate) next: Option<BlockId>,
    /// Set while the block is being destroyed. Neighbours must not be followed.
    pub(crate) garbage: bool,
    pub(crate) formats: Vec<FormatRange>,
    pub(crate) state: i32,
    /// `(revision, previous block state)` of the last highlighter pass.
    pub(crate) highlight_key: Option<(u64, i32)>,
}

impl TextBlock {
    pub(crate) fn new(content: String) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            length: content.chars().count(),
            content,
            revision: 0,
            previous: None,
            next: None,
            garbage: false,
            formats: Vec::new(),
            state: -1,
            highlight_key: None,
        }
    }

    /// Stable identity, assigned in creation order.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bumped on every content change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn previous(&self) -> Option<BlockId> {
        debug_assert!(!self.garbage, "traversing a destroyed block");
        self.previous
    }

    pub fn next(&self) -> Option<BlockId> {
        debug_assert!(!self.garbage, "traversing a destroyed block");
        self.next
    }

    pub fn is_garbage(&self) -> bool {
        self.garbage
    }

    /// Format runs set by the last highlighter pass, sorted by start.
    pub fn formats(&self) -> &[FormatRange] {
        &self.formats
    }

    /// Highlighter state carried to the next block; `-1` when unset.
    pub fn state(&self) -> i32 {
        self.state
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.length = content.chars().count();
        self.content = content;
        self.revision += 1;
    }
}

//! Per-author editing scope.
//!
//! A [`Contributor`] is one author editing any number of documents. It owns one
//! cursor per document, created on first use, and runs transactions, undo and
//! redo under its own [`AuthorId`], so two contributors sharing a document can
//! only undo their own latest change.

use crate::{cursor::CursorId, document::DocumentId, error::Result, TextCursor, TextDocument};
use rustc_hash::FxHashMap;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_AUTHOR: AtomicU64 = AtomicU64::new(1);

/// Identity that transactions and history entries are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorId(u64);

impl AuthorId {
    /// Author of edits made outside any explicit transaction.
    pub const DEFAULT: AuthorId = AuthorId(0);

    /// Fresh, process-unique author.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        AuthorId(NEXT_AUTHOR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == AuthorId::DEFAULT {
            f.write_str("author#default")
        } else {
            write!(f, "author#{}", self.0)
        }
    }
}

#[derive(Debug)]
pub struct Contributor {
    author: AuthorId,
    cursors: FxHashMap<DocumentId, CursorId>,
}

impl Default for Contributor {
    fn default() -> Self {
        Self::new()
    }
}

impl Contributor {
    pub fn new() -> Self {
        Self {
            author: AuthorId::new(),
            cursors: FxHashMap::default(),
        }
    }

    pub fn author(&self) -> AuthorId {
        self.author
    }

    /// This contributor's cursor in `document`, created on first call.
    pub fn cursor<'a>(&mut self, document: &'a mut TextDocument) -> TextCursor<'a> {
        let existing = self.cursors.get(&document.id()).copied();
        let id = match existing {
            Some(id) if document.has_cursor(id) => id,
            _ => {
                let id = document.create_cursor();
                tracing::debug!("{} placed a cursor in {:?}", self.author, document.id());
                self.cursors.insert(document.id(), id);
                id
            },
        };
        TextCursor::new(document, id, self.author)
    }

    pub fn cursor_id(&self, document: &TextDocument) -> Option<CursorId> {
        self.cursors.get(&document.id()).copied()
    }

    pub fn begin_edit(&self, document: &mut TextDocument) -> Result<()> {
        document.begin_transaction(self.author)
    }

    pub fn end_edit(&self, document: &mut TextDocument) -> Result<()> {
        document.end_transaction(self.author)
    }

    pub fn undo(&self, document: &mut TextDocument) -> Result<()> {
        document.undo(self.author)
    }

    pub fn redo(&self, document: &mut TextDocument) -> Result<()> {
        document.redo(self.author)
    }

    /// Deregister this contributor's cursor from `document`.
    pub fn release(&mut self, document: &mut TextDocument) -> Result<()> {
        match self.cursors.remove(&document.id()) {
            Some(id) => document.destroy_cursor(id),
            None => Ok(()),
        }
    }
}

//! The block-list document store.
//!
//! [`TextDocument`] owns a chain of [`TextBlock`]s (one per line), the registry
//! of cursors placed in it, the open transaction and the undo/redo history.
//! Every mutation goes through a handful of primitives that keep these in sync:
//!
//! 1. splice the block chain
//! 2. remap every registered cursor
//! 3. record the change into the open transaction's [`TextDiff`]
//! 4. notify listeners
//!
//! Edits made while no transaction is open are committed as a transaction of
//! their own.
//!
//! # Related
//!
//! - [`crate::TextCursor`] is the editing API most callers use
//! - [`crate::Contributor`] scopes transactions and cursors to one author
//! - `tome_text_transform::Composer` listens to a document to lay it out

use crate::{
    arena::Arena,
    block::{BlockId, TextBlock},
    contributor::AuthorId,
    cursor::{CursorId, CursorRecord, CursorSlot, TextCursor},
    diff::{DiffKind, TextDiff},
    error::{
        AlreadyActiveSnafu, ForeignContributionSnafu, NoActiveTransactionSnafu,
        NotTransactionOwnerSnafu, NothingToRedoSnafu, NothingToUndoSnafu, Result,
        TransactionInProgressSnafu, UnknownCursorSnafu,
    },
    highlight::{HighlightContext, SyntaxHighlighter},
    point::{byte_index, Position},
    range::Range,
};
use rustc_hash::FxHashMap;
use snafu::{ensure, OptionExt};
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// Process-unique document identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

/// Observer of document mutations.
///
/// Callbacks fire synchronously after the document has finished its own
/// bookkeeping for the mutation, so the document passed in is consistent.
/// During [`DocumentListener::block_destroyed`] the destroyed block is still
/// readable but marked garbage; its slot is freed right after.
///
/// A listener that is already borrowed when a notification fires misses it
/// for good, and anything it derives from the document is stale from then
/// on. Debug builds panic instead.
pub trait DocumentListener {
    fn block_inserted(&mut self, _document: &TextDocument, _position: Position, _block: BlockId) {}

    fn block_destroyed(&mut self, _document: &TextDocument, _line: usize, _block: BlockId) {}

    /// `position` is the column of the edit within `block`.
    fn contents_changed(
        &mut self,
        _document: &TextDocument,
        _block: BlockId,
        _position: usize,
        _removed: usize,
        _added: usize,
    ) {
    }

    fn block_count_changed(&mut self, _document: &TextDocument, _count: usize) {}
}

#[derive(Debug)]
struct Transaction {
    author: AuthorId,
    depth: usize,
    diff: TextDiff,
}

/// One committed transaction on the undo or redo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    author: AuthorId,
    delta: TextDiff,
}

impl Contribution {
    pub fn author(&self) -> AuthorId {
        self.author
    }

    /// Diff from the text before the transaction to the text after it.
    pub fn delta(&self) -> &TextDiff {
        &self.delta
    }
}

pub struct TextDocument {
    id: DocumentId,
    blocks: Arena<TextBlock>,
    first: BlockId,
    last: BlockId,
    line_count: usize,
    cursor_slots: Arena<CursorSlot>,
    cursor_records: Arena<CursorRecord>,
    listeners: Vec<Weak<RefCell<dyn DocumentListener>>>,
    transaction: Option<Transaction>,
    undo_stack: Vec<Contribution>,
    redo_stack: Vec<Contribution>,
    history_limit: Option<usize>,
    /// Suppresses diff recording while undo/redo replays a diff.
    replaying: bool,
    highlighter: Option<Box<dyn SyntaxHighlighter>>,
    /// Built on first lookup, dropped whenever the chain gains or loses a block.
    line_index: RefCell<Option<LineIndex>>,
}

/// Line number lookups in both directions.
struct LineIndex {
    blocks: Vec<BlockId>,
    lines: FxHashMap<BlockId, usize>,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDocument {
    /// Empty document with a single empty block.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Build a document from newline separated text. No history is recorded.
    pub fn from_text(text: &str) -> Self {
        let mut blocks = Arena::new();
        let mut lines = text.split('\n');
        let first = blocks.insert(TextBlock::new(lines.next().unwrap_or_default().to_string()));
        let mut last = first;
        let mut line_count = 1;
        for line in lines {
            let mut block = TextBlock::new(line.to_string());
            block.previous = Some(last);
            let id = blocks.insert(block);
            blocks[last].next = Some(id);
            last = id;
            line_count += 1;
        }

        Self {
            id: DocumentId(NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed)),
            blocks,
            first,
            last,
            line_count,
            cursor_slots: Arena::new(),
            cursor_records: Arena::new(),
            listeners: Vec::new(),
            transaction: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: None,
            replaying: false,
            highlighter: None,
            line_index: RefCell::new(None),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    // Block chain access

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn first_block(&self) -> BlockId {
        self.first
    }

    pub fn last_block(&self) -> BlockId {
        self.last
    }

    /// Look up a block. Returns `None` for blocks that have been freed.
    pub fn block(&self, id: BlockId) -> Option<&TextBlock> {
        self.blocks.get(id)
    }

    pub fn next_block(&self, id: BlockId) -> Option<BlockId> {
        self.blocks.get(id).and_then(|block| block.next())
    }

    pub fn previous_block(&self, id: BlockId) -> Option<BlockId> {
        self.blocks.get(id).and_then(|block| block.previous())
    }

    /// Blocks in document order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &TextBlock)> + '_ {
        let mut next = Some(self.first);
        std::iter::from_fn(move || {
            let id = next?;
            let block = &self.blocks[id];
            next = block.next;
            Some((id, block))
        })
    }

    /// Block at `line`, or `None` past the end.
    pub fn block_at(&self, line: usize) -> Option<BlockId> {
        (line < self.line_count).then(|| self.block_for_line(line))
    }

    /// Line index of a live block.
    pub fn line_of(&self, id: BlockId) -> Option<usize> {
        let block = self.blocks.get(id)?;
        if block.garbage {
            return None;
        }
        self.with_line_index(|index| index.lines.get(&id).copied())
    }

    /// Length in characters of `line`, 0 past the end.
    pub fn line_length(&self, line: usize) -> usize {
        self.block_at(line).map_or(0, |id| self.blocks[id].length)
    }

    /// Clamped block lookup.
    pub(crate) fn block_for_line(&self, line: usize) -> BlockId {
        let line = line.min(self.line_count - 1);
        self.with_line_index(|index| index.blocks.get(line).copied())
            .unwrap_or(self.last)
    }

    fn with_line_index<R>(&self, f: impl FnOnce(&LineIndex) -> R) -> R {
        let mut cached = self.line_index.borrow_mut();
        let index = cached.get_or_insert_with(|| {
            let blocks: Vec<BlockId> = self.blocks().map(|(id, _)| id).collect();
            let lines = blocks
                .iter()
                .enumerate()
                .map(|(line, &id)| (id, line))
                .collect();
            tracing::trace!("rebuilt line index over {} blocks", blocks.len());
            LineIndex { blocks, lines }
        });
        f(index)
    }

    fn invalidate_line_index(&mut self) {
        *self.line_index.get_mut() = None;
    }

    /// Nearest valid position to `position`.
    pub fn clamp(&self, position: Position) -> Position {
        let line = position.line.min(self.line_count - 1);
        let length = self.blocks[self.block_for_line(line)].length;
        Position::new(line, position.column.min(length))
    }

    /// End of the last block.
    pub fn end(&self) -> Position {
        Position::new(self.line_count - 1, self.blocks[self.last].length)
    }

    /// Text between two positions, lines joined with `\n`.
    pub fn text_in_range(&self, begin: Position, end: Position) -> String {
        let (begin, end) = (self.clamp(begin.min(end)), self.clamp(begin.max(end)));
        let mut out = String::new();
        let mut id = self.block_for_line(begin.line);
        for line in begin.line..=end.line {
            let content = &self.blocks[id].content;
            let from = if line == begin.line { begin.column } else { 0 };
            let to = if line == end.line {
                end.column
            } else {
                self.blocks[id].length
            };
            out.push_str(&content[byte_index(content, from)..byte_index(content, to)]);
            if line < end.line {
                out.push('\n');
                id = self.blocks[id].next.unwrap_or(id);
            }
        }
        out
    }

    // Listeners

    /// Register a listener. Dropped listeners are pruned on the next call.
    pub fn add_listener(&mut self, listener: Weak<RefCell<dyn DocumentListener>>) {
        self.listeners.retain(|existing| existing.strong_count() > 0);
        self.listeners.push(listener);
    }

    pub fn remove_listener(&mut self, listener: &Rc<RefCell<dyn DocumentListener>>) {
        let target = Rc::downgrade(listener);
        self.listeners
            .retain(|existing| existing.strong_count() > 0 && !existing.ptr_eq(&target));
    }

    fn notify(&self, mut f: impl FnMut(&mut dyn DocumentListener, &Self)) {
        for listener in &self.listeners {
            let Some(listener) = listener.upgrade() else {
                continue;
            };
            let borrowed = listener.try_borrow_mut();
            debug_assert!(
                borrowed.is_ok(),
                "listener is borrowed during a document notification"
            );
            match borrowed {
                Ok(mut guard) => f(&mut *guard, self),
                Err(_) => tracing::warn!("listener is busy, notification dropped"),
            };
        }
    }

    // Cursor registry

    /// Register a cursor at the start of the document.
    pub fn create_cursor(&mut self) -> CursorId {
        let record = self.cursor_records.insert(CursorRecord {
            block: self.first,
            position: Position::zero(),
            anchor: Position::zero(),
            shares: 1,
        });
        self.cursor_slots.insert(CursorSlot { record })
    }

    /// Register a second handle to the cursor `id`.
    ///
    /// Both handles observe the same position until one of them is moved,
    /// which gives it a private copy.
    pub fn duplicate_cursor(&mut self, id: CursorId) -> Result<CursorId> {
        let record = self.cursor_slots.get(id).context(UnknownCursorSnafu { id })?.record;
        self.cursor_records[record].shares += 1;
        Ok(self.cursor_slots.insert(CursorSlot { record }))
    }

    pub fn destroy_cursor(&mut self, id: CursorId) -> Result<()> {
        let slot = self.cursor_slots.remove(id).context(UnknownCursorSnafu { id })?;
        let record = &mut self.cursor_records[slot.record];
        record.shares -= 1;
        if record.shares == 0 {
            self.cursor_records.remove(slot.record);
        }
        Ok(())
    }

    pub fn has_cursor(&self, id: CursorId) -> bool {
        self.cursor_slots.contains(id)
    }

    pub fn cursor_count(&self) -> usize {
        self.cursor_slots.len()
    }

    /// Editing handle for a registered cursor.
    pub fn cursor(&mut self, id: CursorId) -> Result<TextCursor<'_>> {
        self.cursor_as(id, AuthorId::DEFAULT)
    }

    pub(crate) fn cursor_as(&mut self, id: CursorId, author: AuthorId) -> Result<TextCursor<'_>> {
        ensure!(self.cursor_slots.contains(id), UnknownCursorSnafu { id });
        Ok(TextCursor::new(self, id, author))
    }

    pub fn cursor_position(&self, id: CursorId) -> Result<Position> {
        let slot = self.cursor_slots.get(id).context(UnknownCursorSnafu { id })?;
        Ok(self.cursor_records[slot.record].position)
    }

    /// Span between a cursor's anchor and position, in document order.
    pub fn cursor_selection(&self, id: CursorId) -> Result<Range> {
        let slot = self.cursor_slots.get(id).context(UnknownCursorSnafu { id })?;
        let record = &self.cursor_records[slot.record];
        Ok(Range::new(record.anchor, record.position))
    }

    pub(crate) fn cursor_record(&self, id: CursorId) -> &CursorRecord {
        &self.cursor_records[self.cursor_slots[id].record]
    }

    #[cfg(test)]
    pub(crate) fn cursor_records_for_tests(
        &self,
    ) -> impl Iterator<Item = (crate::arena::Handle<CursorRecord>, &CursorRecord)> {
        self.cursor_records.iter()
    }

    /// Mutable record for `id`, detached from any other handle sharing it.
    pub(crate) fn cursor_record_mut(&mut self, id: CursorId) -> &mut CursorRecord {
        let shared = self.cursor_slots[id].record;
        if self.cursor_records[shared].shares > 1 {
            self.cursor_records[shared].shares -= 1;
            let copy = CursorRecord {
                shares: 1,
                ..self.cursor_records[shared].clone()
            };
            let record = self.cursor_records.insert(copy);
            self.cursor_slots[id].record = record;
        }
        &mut self.cursor_records[self.cursor_slots[id].record]
    }

    /// Apply `f` to every cursor position and anchor. Positions that land on
    /// `retarget.0` are rebound to block `retarget.1`.
    fn remap_cursors(
        &mut self,
        f: impl Fn(Position) -> Position,
        retarget: Option<(usize, BlockId)>,
    ) {
        for (_, record) in self.cursor_records.iter_mut() {
            record.position = f(record.position);
            record.anchor = f(record.anchor);
            if let Some((line, block)) = retarget {
                if record.position.line == line {
                    record.block = block;
                }
            }
        }
    }

    // Transactions and history

    /// Open a transaction, or nest into one already opened by `author`.
    pub fn begin_transaction(&mut self, author: AuthorId) -> Result<()> {
        match &mut self.transaction {
            Some(transaction) => {
                ensure!(
                    transaction.author == author,
                    AlreadyActiveSnafu {
                        owner: transaction.author,
                        requested: author,
                    }
                );
                transaction.depth += 1;
            },
            None => {
                self.transaction = Some(Transaction {
                    author,
                    depth: 1,
                    diff: TextDiff::new(),
                });
            },
        }
        Ok(())
    }

    /// Close one level of `author`'s transaction, committing at depth zero.
    pub fn end_transaction(&mut self, author: AuthorId) -> Result<()> {
        let transaction = self.transaction.as_mut().context(NoActiveTransactionSnafu)?;
        ensure!(
            transaction.author == author,
            NotTransactionOwnerSnafu {
                owner: transaction.author,
                requested: author,
            }
        );
        transaction.depth -= 1;
        if transaction.depth == 0 {
            self.commit();
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn transaction_owner(&self) -> Option<AuthorId> {
        self.transaction.as_ref().map(|transaction| transaction.author)
    }

    fn commit(&mut self) {
        let Some(mut transaction) = self.transaction.take() else {
            return;
        };
        transaction.diff.simplify();
        if transaction.diff.is_empty() {
            return;
        }
        tracing::debug!(
            "commit {} changes by {}",
            transaction.diff.len(),
            transaction.author
        );
        self.redo_stack.clear();
        self.undo_stack.push(Contribution {
            author: transaction.author,
            delta: transaction.diff,
        });
        self.enforce_history_limit();
    }

    /// Run `f` inside the open transaction, or in an implicit one owned by
    /// `author` if none is open.
    pub(crate) fn edit<R>(&mut self, author: AuthorId, f: impl FnOnce(&mut Self) -> R) -> R {
        let implicit = self.transaction.is_none() && !self.replaying;
        if implicit {
            self.transaction = Some(Transaction {
                author,
                depth: 1,
                diff: TextDiff::new(),
            });
        }
        let result = f(self);
        if implicit {
            self.commit();
        }
        result
    }

    fn record_change(&mut self, kind: DiffKind, position: Position, text: &str) {
        if self.replaying {
            return;
        }
        if let Some(transaction) = &mut self.transaction {
            match kind {
                DiffKind::Insertion => transaction.diff.add_insertion(position, text),
                DiffKind::Removal => transaction.diff.add_removal(position, text),
            }
        }
    }

    /// Revert the latest contribution, which must belong to `author`.
    pub fn undo(&mut self, author: AuthorId) -> Result<()> {
        ensure!(self.transaction.is_none(), TransactionInProgressSnafu);
        let top = self.undo_stack.last().context(NothingToUndoSnafu)?;
        ensure!(
            top.author == author,
            ForeignContributionSnafu {
                owner: top.author,
                requested: author,
            }
        );
        let Some(contribution) = self.undo_stack.pop() else {
            return NothingToUndoSnafu.fail();
        };
        tracing::debug!("undo {} changes by {author}", contribution.delta.len());
        self.replay(contribution.delta.inverted());
        self.redo_stack.push(contribution);
        Ok(())
    }

    /// Reapply the latest undone contribution, which must belong to `author`.
    pub fn redo(&mut self, author: AuthorId) -> Result<()> {
        ensure!(self.transaction.is_none(), TransactionInProgressSnafu);
        let top = self.redo_stack.last().context(NothingToRedoSnafu)?;
        ensure!(
            top.author == author,
            ForeignContributionSnafu {
                owner: top.author,
                requested: author,
            }
        );
        let Some(contribution) = self.redo_stack.pop() else {
            return NothingToRedoSnafu.fail();
        };
        tracing::debug!("redo {} changes by {author}", contribution.delta.len());
        self.replay(contribution.delta.clone());
        self.undo_stack.push(contribution);
        Ok(())
    }

    pub fn can_undo(&self, author: AuthorId) -> bool {
        self.transaction.is_none() && self.undo_stack.last().is_some_and(|top| top.author == author)
    }

    pub fn can_redo(&self, author: AuthorId) -> bool {
        self.transaction.is_none() && self.redo_stack.last().is_some_and(|top| top.author == author)
    }

    pub fn undo_stack(&self) -> &[Contribution] {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &[Contribution] {
        &self.redo_stack
    }

    /// Bound the undo stack to `limit` entries, dropping the oldest first.
    pub fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history_limit = limit;
        self.enforce_history_limit();
    }

    fn enforce_history_limit(&mut self) {
        if let Some(limit) = self.history_limit {
            if self.undo_stack.len() > limit {
                let excess = self.undo_stack.len() - limit;
                self.undo_stack.drain(..excess);
                tracing::trace!("dropped {excess} old history entries");
            }
        }
    }

    fn replay(&mut self, mut diff: TextDiff) {
        self.replaying = true;
        while let Some(next) = diff.take_first() {
            let position = next.content.position;
            match next.kind {
                DiffKind::Insertion => {
                    self.insert_at(position, &next.content.text);
                },
                DiffKind::Removal => {
                    self.remove_range(position, next.content.end());
                },
            }
        }
        self.replaying = false;
    }

    // Public editing entry points

    /// Insert `text` at `position`; line feeds split blocks. Returns the
    /// position just past the inserted text.
    pub fn insert_text(&mut self, position: Position, text: &str) -> Position {
        let at = self.clamp(position);
        self.edit(AuthorId::DEFAULT, |document| document.insert_at(at, text))
    }

    /// Split the block at `position`.
    pub fn insert_block(&mut self, position: Position) {
        let at = self.clamp(position);
        self.edit(AuthorId::DEFAULT, |document| document.insert_at(at, "\n"));
    }

    /// Remove the text between two positions and return it.
    pub fn remove_text(&mut self, begin: Position, end: Position) -> String {
        let (begin, end) = (self.clamp(begin.min(end)), self.clamp(begin.max(end)));
        self.edit(AuthorId::DEFAULT, |document| document.remove_range(begin, end))
    }

    /// Remove the character after `position`, joining blocks at a block end.
    /// Returns `false` at the end of the document.
    pub fn delete_char(&mut self, position: Position) -> bool {
        let at = self.clamp(position);
        self.edit(AuthorId::DEFAULT, |document| document.delete_char_at(at))
    }

    /// Remove the character before `position`, joining blocks at a block
    /// start. Returns `false` at the start of the document.
    pub fn delete_previous_char(&mut self, position: Position) -> bool {
        let at = self.clamp(position);
        self.edit(AuthorId::DEFAULT, |document| document.delete_previous_char_at(at))
    }

    // Composite operations, positions already clamped

    pub(crate) fn insert_at(&mut self, at: Position, text: &str) -> Position {
        let mut position = at;
        let mut block = self.block_for_line(at.line);
        for (index, piece) in text.split('\n').enumerate() {
            if index > 0 {
                block = self.split_block(block, position);
                position = Position::new(position.line + 1, 0);
            }
            self.insert_in_block(block, position, piece);
            position.column += piece.chars().count();
        }
        position
    }

    pub(crate) fn remove_range(&mut self, begin: Position, end: Position) -> String {
        if begin >= end {
            return String::new();
        }
        let removed = self.text_in_range(begin, end);
        let first = self.block_for_line(begin.line);
        if begin.line == end.line {
            self.remove_in_block(first, begin, end.column - begin.column);
            return removed;
        }

        let trailing = self.blocks[first].length - begin.column;
        self.remove_in_block(first, begin, trailing);
        for _ in begin.line + 1..end.line {
            self.destroy_next(first, begin.line);
        }
        if let Some(last) = self.blocks[first].next {
            self.remove_in_block(last, Position::new(begin.line + 1, 0), end.column);
        }
        self.merge_with_next(first, begin.line);
        removed
    }

    pub(crate) fn delete_char_at(&mut self, at: Position) -> bool {
        let block = self.block_for_line(at.line);
        if at.column < self.blocks[block].length {
            self.remove_in_block(block, at, 1);
            true
        } else {
            self.merge_with_next(block, at.line)
        }
    }

    pub(crate) fn delete_previous_char_at(&mut self, at: Position) -> bool {
        let block = self.block_for_line(at.line);
        if at.column > 0 {
            self.remove_in_block(block, Position::new(at.line, at.column - 1), 1);
            return true;
        }
        match self.blocks[block].previous {
            Some(previous) => self.merge_with_next(previous, at.line - 1),
            None => false,
        }
    }

    // Primitives

    /// Insert `text` (no line feeds) into `block` at `at`.
    fn insert_in_block(&mut self, block: BlockId, at: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        let added = text.chars().count();
        let target = &mut self.blocks[block];
        let mut content = std::mem::take(&mut target.content);
        content.insert_str(byte_index(&content, at.column), text);
        target.set_content(content);

        self.remap_cursors(
            |p| {
                if p.line == at.line && p.column >= at.column {
                    Position::new(p.line, p.column + added)
                } else {
                    p
                }
            },
            None,
        );
        self.record_change(DiffKind::Insertion, at, text);
        self.notify(|listener, document| {
            listener.contents_changed(document, block, at.column, 0, added)
        });
    }

    /// Remove up to `count` characters from `block` starting at `at`.
    fn remove_in_block(&mut self, block: BlockId, at: Position, count: usize) {
        let target = &mut self.blocks[block];
        let start = byte_index(&target.content, at.column);
        let end = byte_index(&target.content, at.column + count);
        if start == end {
            return;
        }
        let mut content = std::mem::take(&mut target.content);
        let removed: String = content.drain(start..end).collect();
        target.set_content(content);
        let count = removed.chars().count();

        self.remap_cursors(
            |p| {
                if p.line != at.line || p.column <= at.column {
                    p
                } else if p.column <= at.column + count {
                    Position::new(p.line, at.column)
                } else {
                    Position::new(p.line, p.column - count)
                }
            },
            None,
        );
        self.record_change(DiffKind::Removal, at, &removed);
        self.notify(|listener, document| {
            listener.contents_changed(document, block, at.column, count, 0)
        });
    }

    /// Split `block` at `at`, moving the tail into a new block after it.
    fn split_block(&mut self, block: BlockId, at: Position) -> BlockId {
        let target = &mut self.blocks[block];
        let split = byte_index(&target.content, at.column);
        let tail = if split < target.content.len() {
            let mut content = std::mem::take(&mut target.content);
            let tail = content.split_off(split);
            target.set_content(content);
            tail
        } else {
            String::new()
        };
        let moved = tail.chars().count();
        let after = target.next;

        let mut created = TextBlock::new(tail);
        created.previous = Some(block);
        created.next = after;
        let id = self.blocks.insert(created);
        self.blocks[block].next = Some(id);
        match after {
            Some(after) => self.blocks[after].previous = Some(id),
            None => self.last = id,
        }
        self.line_count += 1;
        self.invalidate_line_index();

        self.remap_cursors(
            |p| {
                if p.line > at.line {
                    Position::new(p.line + 1, p.column)
                } else if p.line == at.line && p.column >= at.column {
                    Position::new(p.line + 1, p.column - at.column)
                } else {
                    p
                }
            },
            Some((at.line + 1, id)),
        );
        self.record_change(DiffKind::Insertion, at, "\n");

        tracing::trace!("split block at {at}");
        if moved > 0 {
            self.notify(|listener, document| {
                listener.contents_changed(document, block, at.column, moved, 0)
            });
        }
        self.notify(|listener, document| {
            listener.block_inserted(document, Position::new(at.line + 1, 0), id)
        });
        let count = self.line_count;
        self.notify(|listener, document| listener.block_count_changed(document, count));
        id
    }

    /// Append the block after `block` (at `line`) to it and destroy the former.
    fn merge_with_next(&mut self, block: BlockId, line: usize) -> bool {
        let Some(next) = self.blocks[block].next else {
            return false;
        };
        let offset = self.blocks[block].length;
        let appended = self.blocks[next].content.clone();
        let added = self.blocks[next].length;
        let after = self.blocks[next].next;

        let target = &mut self.blocks[block];
        if !appended.is_empty() {
            let mut content = std::mem::take(&mut target.content);
            content.push_str(&appended);
            target.set_content(content);
        }
        target.next = after;
        match after {
            Some(after) => self.blocks[after].previous = Some(block),
            None => self.last = block,
        }
        self.blocks[next].garbage = true;
        self.line_count -= 1;
        self.invalidate_line_index();

        self.remap_cursors(
            |p| {
                if p.line == line + 1 {
                    Position::new(line, p.column + offset)
                } else if p.line > line + 1 {
                    Position::new(p.line - 1, p.column)
                } else {
                    p
                }
            },
            Some((line, block)),
        );
        self.record_change(DiffKind::Removal, Position::new(line, offset), "\n");

        tracing::trace!("merged line {} into {line}", line + 1);
        self.notify(|listener, document| listener.block_destroyed(document, line + 1, next));
        if added > 0 {
            self.notify(|listener, document| {
                listener.contents_changed(document, block, offset, 0, added)
            });
        }
        let count = self.line_count;
        self.notify(|listener, document| listener.block_count_changed(document, count));
        self.blocks.remove(next);
        true
    }

    /// Destroy the block following `block` (at `line`) with its content.
    fn destroy_next(&mut self, block: BlockId, line: usize) {
        let Some(doomed) = self.blocks[block].next else {
            return;
        };
        let end = Position::new(line, self.blocks[block].length);
        let removed = format!("\n{}", self.blocks[doomed].content);
        let after = self.blocks[doomed].next;

        self.blocks[block].next = after;
        match after {
            Some(after) => self.blocks[after].previous = Some(block),
            None => self.last = block,
        }
        self.blocks[doomed].garbage = true;
        self.line_count -= 1;
        self.invalidate_line_index();

        self.remap_cursors(
            |p| {
                if p.line == line + 1 {
                    end
                } else if p.line > line + 1 {
                    Position::new(p.line - 1, p.column)
                } else {
                    p
                }
            },
            Some((line, block)),
        );
        self.record_change(DiffKind::Removal, end, &removed);

        self.notify(|listener, document| listener.block_destroyed(document, line + 1, doomed));
        let count = self.line_count;
        self.notify(|listener, document| listener.block_count_changed(document, count));
        self.blocks.remove(doomed);
    }

    // Highlighting

    pub fn set_highlighter(&mut self, highlighter: Option<Box<dyn SyntaxHighlighter>>) {
        self.highlighter = highlighter;
        for (_, block) in self.blocks.iter_mut() {
            block.highlight_key = None;
            block.formats.clear();
            block.state = -1;
        }
    }

    /// Run the highlighter over blocks whose revision or incoming state
    /// changed since the last pass. Returns the number of blocks highlighted.
    pub fn rehighlight(&mut self) -> usize {
        let Some(mut highlighter) = self.highlighter.take() else {
            return 0;
        };
        let mut previous_state = -1;
        let mut highlighted = 0;
        let mut next = Some(self.first);
        while let Some(id) = next {
            let block = &mut self.blocks[id];
            next = block.next;
            let key = (block.revision, previous_state);
            if block.highlight_key != Some(key) {
                block.formats.clear();
                let mut context =
                    HighlightContext::new(id, &mut block.formats, &mut block.state, previous_state);
                highlighter.highlight_block(&block.content, &mut context);
                block.highlight_key = Some(key);
                highlighted += 1;
            }
            previous_state = block.state;
        }
        self.highlighter = Some(highlighter);
        tracing::trace!("highlighted {highlighted} blocks");
        highlighted
    }
}

impl fmt::Display for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (_, block)) in self.blocks().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&block.content)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextDocument")
            .field("id", &self.id)
            .field("line_count", &self.line_count)
            .field("cursors", &self.cursor_slots.len())
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .finish_non_exhaustive()
    }
}

impl Drop for TextDocument {
    fn drop(&mut self) {
        let live = self.cursor_slots.len();
        if live > 0 {
            tracing::warn!("document {:?} dropped with {live} live cursors", self.id);
        }
    }
}

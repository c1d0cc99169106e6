//! Cursor and selection management
//!
//! A cursor is a position plus an anchor registered with a [`TextDocument`].
//! The document keeps every registered cursor in place as text is inserted and
//! removed around it; [`TextCursor`] is the borrowed handle used to move a
//! cursor and to edit at it.
//!
//! Cursor handles are copy-on-write: [`TextDocument::duplicate_cursor`] makes
//! a second handle onto the same record, and the first handle to move gets a
//! private copy.

use crate::{
    arena::Handle,
    block::BlockId,
    contributor::AuthorId,
    point::Position,
    range::Range,
    TextDocument,
};

/// Document-owned cursor state, possibly shared between handles.
#[derive(Debug, Clone)]
pub struct CursorRecord {
    pub(crate) block: BlockId,
    pub(crate) position: Position,
    pub(crate) anchor: Position,
    /// Number of handles pointing at this record.
    pub(crate) shares: usize,
}

/// Registry entry behind a [`CursorId`].
#[derive(Debug)]
pub struct CursorSlot {
    pub(crate) record: Handle<CursorRecord>,
}

/// Handle to a cursor registered with a document.
pub type CursorId = Handle<CursorSlot>;

/// Whether a movement drags the anchor along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Collapse the selection onto the new position
    Move,
    /// Leave the anchor where it is, extending the selection
    KeepAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOperation {
    Left,
    Right,
    Up,
    Down,
    StartOfBlock,
    EndOfBlock,
    Start,
    End,
    NextWord,
    PreviousWord,
}

#[derive(PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punctuation,
}

impl CharClass {
    fn of(ch: char) -> Self {
        if ch.is_whitespace() {
            CharClass::Space
        } else if ch.is_alphanumeric() || ch == '_' {
            CharClass::Word
        } else {
            CharClass::Punctuation
        }
    }
}

/// Borrowed editing handle for one cursor of a document.
pub struct TextCursor<'a> {
    document: &'a mut TextDocument,
    id: CursorId,
    author: AuthorId,
}

impl<'a> TextCursor<'a> {
    pub(crate) fn new(document: &'a mut TextDocument, id: CursorId, author: AuthorId) -> Self {
        Self {
            document,
            id,
            author,
        }
    }

    pub fn id(&self) -> CursorId {
        self.id
    }

    /// Author that implicit transactions opened by this handle belong to.
    pub fn author(&self) -> AuthorId {
        self.author
    }

    pub fn document(&self) -> &TextDocument {
        self.document
    }

    pub fn position(&self) -> Position {
        self.document.cursor_record(self.id).position
    }

    pub fn anchor(&self) -> Position {
        self.document.cursor_record(self.id).anchor
    }

    /// Block containing [`Self::position`].
    pub fn block(&self) -> BlockId {
        self.document.cursor_record(self.id).block
    }

    pub fn has_selection(&self) -> bool {
        self.position() != self.anchor()
    }

    pub fn selection_start(&self) -> Position {
        self.position().min(self.anchor())
    }

    pub fn selection_end(&self) -> Position {
        self.position().max(self.anchor())
    }

    pub fn selection(&self) -> Range {
        Range::new(self.anchor(), self.position())
    }

    /// Selected text with a line feed per block boundary crossed.
    pub fn selected_text(&self) -> String {
        self.document
            .text_in_range(self.selection_start(), self.selection_end())
    }

    /// Move to `position`, clamped to the document.
    pub fn set_position(&mut self, position: Position, mode: MoveMode) {
        let position = self.document.clamp(position);
        let block = self.document.block_for_line(position.line);
        let record = self.document.cursor_record_mut(self.id);
        record.position = position;
        record.block = block;
        if mode == MoveMode::Move {
            record.anchor = position;
        }
    }

    pub fn clear_selection(&mut self) {
        let position = self.position();
        self.set_position(position, MoveMode::Move);
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        self.set_position(Position::zero(), MoveMode::Move);
        let end = self.document.end();
        self.set_position(end, MoveMode::KeepAnchor);
    }

    /// Move `count` steps. Returns `false` if a document boundary stopped the
    /// movement early.
    pub fn move_position(&mut self, operation: MoveOperation, mode: MoveMode, count: usize) -> bool {
        let start = self.position();
        let mut position = start;
        let mut complete = true;

        match operation {
            MoveOperation::Left => {
                for _ in 0..count {
                    match self.step_left(position) {
                        Some(next) => position = next,
                        None => {
                            complete = false;
                            break;
                        },
                    }
                }
            },
            MoveOperation::Right => {
                for _ in 0..count {
                    match self.step_right(position) {
                        Some(next) => position = next,
                        None => {
                            complete = false;
                            break;
                        },
                    }
                }
            },
            MoveOperation::Up => {
                let line = position.line.saturating_sub(count);
                complete = position.line >= count;
                position = Position::new(line, position.column);
            },
            MoveOperation::Down => {
                let last = self.document.line_count() - 1;
                let line = (position.line + count).min(last);
                complete = position.line + count <= last;
                position = Position::new(line, position.column);
            },
            MoveOperation::StartOfBlock => position.column = 0,
            MoveOperation::EndOfBlock => {
                position.column = self.document.line_length(position.line);
            },
            MoveOperation::Start => position = Position::zero(),
            MoveOperation::End => position = self.document.end(),
            MoveOperation::NextWord => {
                for _ in 0..count {
                    match self.next_word(position) {
                        Some(next) => position = next,
                        None => {
                            complete = false;
                            break;
                        },
                    }
                }
            },
            MoveOperation::PreviousWord => {
                for _ in 0..count {
                    match self.previous_word(position) {
                        Some(next) => position = next,
                        None => {
                            complete = false;
                            break;
                        },
                    }
                }
            },
        }

        self.set_position(position, mode);
        complete
    }

    fn step_left(&self, at: Position) -> Option<Position> {
        if at.column > 0 {
            Some(Position::new(at.line, at.column - 1))
        } else if at.line > 0 {
            Some(Position::new(at.line - 1, self.document.line_length(at.line - 1)))
        } else {
            None
        }
    }

    fn step_right(&self, at: Position) -> Option<Position> {
        if at.column < self.document.line_length(at.line) {
            Some(Position::new(at.line, at.column + 1))
        } else if at.line + 1 < self.document.line_count() {
            Some(Position::new(at.line + 1, 0))
        } else {
            None
        }
    }

    fn line_chars(&self, line: usize) -> Vec<char> {
        self.document
            .block_at(line)
            .and_then(|id| self.document.block(id))
            .map(|block| block.content().chars().collect())
            .unwrap_or_default()
    }

    /// Start of the next word, or the start of the next block from a block end.
    fn next_word(&self, at: Position) -> Option<Position> {
        let chars = self.line_chars(at.line);
        if at.column >= chars.len() {
            return self.step_right(at);
        }
        let mut column = at.column;
        let class = CharClass::of(chars[column]);
        while column < chars.len() && CharClass::of(chars[column]) == class {
            column += 1;
        }
        while column < chars.len() && CharClass::of(chars[column]) == CharClass::Space {
            column += 1;
        }
        Some(Position::new(at.line, column))
    }

    /// Start of the previous word, or the end of the previous block from a
    /// block start.
    fn previous_word(&self, at: Position) -> Option<Position> {
        if at.column == 0 {
            return self.step_left(at);
        }
        let chars = self.line_chars(at.line);
        let mut column = at.column.min(chars.len());
        while column > 0 && CharClass::of(chars[column - 1]) == CharClass::Space {
            column -= 1;
        }
        if column > 0 {
            let class = CharClass::of(chars[column - 1]);
            while column > 0 && CharClass::of(chars[column - 1]) == class {
                column -= 1;
            }
        }
        Some(Position::new(at.line, column))
    }

    // Editing

    /// Replace the selection (if any) with `text`.
    pub fn insert_text(&mut self, text: &str) {
        let author = self.author;
        let (start, end) = (self.selection_start(), self.selection_end());
        self.document.edit(author, |document| {
            document.remove_range(start, end);
            document.insert_at(start, text);
        });
        self.clear_selection();
    }

    /// Replace the selection (if any) with a block break.
    pub fn insert_block(&mut self) {
        self.insert_text("\n");
    }

    /// Remove the selection, or the character after the cursor. Returns
    /// `false` if there was nothing to remove.
    pub fn delete_char(&mut self) -> bool {
        if self.has_selection() {
            return self.remove_selected_text();
        }
        let (author, at) = (self.author, self.position());
        self.document
            .edit(author, |document| document.delete_char_at(at))
    }

    /// Remove the selection, or the character before the cursor. Returns
    /// `false` if there was nothing to remove.
    pub fn delete_previous_char(&mut self) -> bool {
        if self.has_selection() {
            return self.remove_selected_text();
        }
        let (author, at) = (self.author, self.position());
        self.document
            .edit(author, |document| document.delete_previous_char_at(at))
    }

    /// Remove the selected text. Returns `false` without a selection.
    pub fn remove_selected_text(&mut self) -> bool {
        if !self.has_selection() {
            return false;
        }
        let (author, start, end) = (self.author, self.selection_start(), self.selection_end());
        self.document
            .edit(author, |document| document.remove_range(start, end));
        self.clear_selection();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{assert_cursors_consistent, p};

    fn with_cursor(text: &str, at: Position, f: impl FnOnce(&mut TextCursor<'_>)) -> TextDocument {
        let mut document = TextDocument::from_text(text);
        let id = document.create_cursor();
        {
            let mut cursor = document.cursor(id).unwrap();
            cursor.set_position(at, MoveMode::Move);
            f(&mut cursor);
        }
        assert_cursors_consistent(&document);
        document.destroy_cursor(id).unwrap();
        document
    }

    #[test]
    fn left_and_right_cross_blocks() {
        with_cursor("ab\ncd", p(1, 0), |cursor| {
            assert!(cursor.move_position(MoveOperation::Left, MoveMode::Move, 1));
            assert_eq!(cursor.position(), p(0, 2));
            assert!(cursor.move_position(MoveOperation::Right, MoveMode::Move, 2));
            assert_eq!(cursor.position(), p(1, 1));
        });
    }

    #[test]
    fn movement_reports_partial_distance() {
        with_cursor("ab\ncd", p(0, 1), |cursor| {
            assert!(!cursor.move_position(MoveOperation::Left, MoveMode::Move, 5));
            assert_eq!(cursor.position(), p(0, 0));
            assert!(!cursor.move_position(MoveOperation::Right, MoveMode::Move, 99));
            assert_eq!(cursor.position(), p(1, 2));
            assert!(!cursor.move_position(MoveOperation::Down, MoveMode::Move, 1));
        });
    }

    #[test]
    fn up_and_down_clamp_column() {
        with_cursor("long line\nab\nanother", p(0, 7), |cursor| {
            assert!(cursor.move_position(MoveOperation::Down, MoveMode::Move, 1));
            assert_eq!(cursor.position(), p(1, 2));
            assert!(cursor.move_position(MoveOperation::Down, MoveMode::Move, 1));
            assert_eq!(cursor.position(), p(2, 2));
            assert!(!cursor.move_position(MoveOperation::Up, MoveMode::Move, 3));
            assert_eq!(cursor.position(), p(0, 2));
        });
    }

    #[test]
    fn block_and_document_bounds() {
        with_cursor("abc\ndefg", p(1, 2), |cursor| {
            cursor.move_position(MoveOperation::StartOfBlock, MoveMode::Move, 1);
            assert_eq!(cursor.position(), p(1, 0));
            cursor.move_position(MoveOperation::EndOfBlock, MoveMode::Move, 1);
            assert_eq!(cursor.position(), p(1, 4));
            cursor.move_position(MoveOperation::Start, MoveMode::KeepAnchor, 1);
            assert_eq!(cursor.position(), p(0, 0));
            assert_eq!(cursor.anchor(), p(1, 4));
            cursor.move_position(MoveOperation::End, MoveMode::Move, 1);
            assert_eq!(cursor.position(), p(1, 4));
            assert!(!cursor.has_selection());
        });
    }

    #[test]
    fn word_movement() {
        with_cursor("let x = foo(bar);\nnext", p(0, 0), |cursor| {
            let mut stops = Vec::new();
            while cursor.move_position(MoveOperation::NextWord, MoveMode::Move, 1) {
                stops.push(cursor.position());
            }
            assert_eq!(
                stops,
                vec![
                    p(0, 4),
                    p(0, 6),
                    p(0, 8),
                    p(0, 11),
                    p(0, 12),
                    p(0, 15),
                    p(0, 17),
                    p(1, 0),
                    p(1, 4)
                ]
            );
            assert!(cursor.move_position(MoveOperation::PreviousWord, MoveMode::Move, 1));
            assert_eq!(cursor.position(), p(1, 0));
            assert!(cursor.move_position(MoveOperation::PreviousWord, MoveMode::Move, 2));
            assert_eq!(cursor.position(), p(0, 15));
        });
    }

    #[test]
    fn set_position_clamps() {
        with_cursor("abc\nde", p(7, 7), |cursor| {
            assert_eq!(cursor.position(), p(1, 2));
        });
    }

    #[test]
    fn selected_text_joins_blocks() {
        with_cursor("hello\nworld\n!", p(0, 3), |cursor| {
            cursor.set_position(p(2, 1), MoveMode::KeepAnchor);
            assert_eq!(cursor.selected_text(), "lo\nworld\n!");
            assert_eq!(cursor.selection_start(), p(0, 3));
            assert_eq!(cursor.selection_end(), p(2, 1));
        });
    }

    #[test]
    fn insert_replaces_selection() {
        let document = with_cursor("hello world", p(0, 6), |cursor| {
            cursor.set_position(p(0, 11), MoveMode::KeepAnchor);
            cursor.insert_text("there");
            assert_eq!(cursor.position(), p(0, 11));
            assert!(!cursor.has_selection());
        });
        assert_eq!(document.to_string(), "hello there");
        assert_eq!(document.undo_stack().len(), 1);
    }

    #[test]
    fn insert_block_moves_cursor_to_new_block() {
        let document = with_cursor("abcd", p(0, 2), |cursor| {
            cursor.insert_block();
            assert_eq!(cursor.position(), p(1, 0));
            assert_eq!(cursor.document().line_of(cursor.block()), Some(1));
        });
        assert_eq!(document.to_string(), "ab\ncd");
    }

    #[test]
    fn delete_chars() {
        let document = with_cursor("ab\ncd", p(1, 0), |cursor| {
            assert!(cursor.delete_previous_char());
            assert_eq!(cursor.position(), p(0, 2));
            assert!(cursor.delete_char());
            assert_eq!(cursor.position(), p(0, 2));
            assert!(cursor.delete_char());
            assert!(!cursor.delete_char());
        });
        assert_eq!(document.to_string(), "ab");
    }

    #[test]
    fn remove_selected_text_needs_selection() {
        let document = with_cursor("abc\ndef", p(0, 1), |cursor| {
            assert!(!cursor.remove_selected_text());
            cursor.set_position(p(1, 1), MoveMode::KeepAnchor);
            assert!(cursor.remove_selected_text());
            assert_eq!(cursor.position(), p(0, 1));
        });
        assert_eq!(document.to_string(), "aef");
    }

    #[test]
    fn duplicated_cursor_detaches_on_move() {
        let mut document = TextDocument::from_text("abcdef");
        let original = document.create_cursor();
        document
            .cursor(original)
            .unwrap()
            .set_position(p(0, 2), MoveMode::Move);
        let copy = document.duplicate_cursor(original).unwrap();
        assert_eq!(document.cursor_position(copy).unwrap(), p(0, 2));

        // Shared record follows edits.
        document.insert_text(p(0, 0), "xy");
        assert_eq!(document.cursor_position(original).unwrap(), p(0, 4));
        assert_eq!(document.cursor_position(copy).unwrap(), p(0, 4));

        // Moving one handle detaches it.
        document
            .cursor(copy)
            .unwrap()
            .set_position(p(0, 0), MoveMode::Move);
        assert_eq!(document.cursor_position(original).unwrap(), p(0, 4));
        assert_eq!(document.cursor_position(copy).unwrap(), p(0, 0));

        document.destroy_cursor(original).unwrap();
        document.destroy_cursor(copy).unwrap();
        assert_eq!(
            document.destroy_cursor(copy),
            Err(crate::TextError::UnknownCursor { id: copy })
        );
    }
}

//! Test helpers to reduce boilerplate in tests

use crate::{block::BlockId, document::DocumentListener, point::Position, TextDocument};
use std::{cell::RefCell, rc::Rc};

/// Shorthand for [`Position::new`]
pub fn p(line: usize, column: usize) -> Position {
    Position::new(line, column)
}

/// Assert every registered cursor sits inside its block and that its block is
/// the one at its line
pub fn assert_cursors_consistent(document: &TextDocument) {
    for (_, record) in document.cursor_records_for_tests() {
        let line_block = document.block_at(record.position.line);
        assert_eq!(line_block, Some(record.block), "cursor block out of sync: {record:?}");
        let length = document.line_length(record.position.line);
        assert!(record.position.column <= length, "cursor past block end: {record:?}");
        assert!(document.clamp(record.anchor) == record.anchor, "anchor out of range: {record:?}");
    }
}

/// Listener that logs every callback as a short string
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<String>,
}

impl Recorder {
    pub fn shared() -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder::default()))
    }
}

impl DocumentListener for Recorder {
    fn block_inserted(&mut self, _document: &TextDocument, position: Position, _block: BlockId) {
        self.events.push(format!("inserted {}", position.line));
    }

    fn block_destroyed(&mut self, _document: &TextDocument, line: usize, _block: BlockId) {
        self.events.push(format!("destroyed {line}"));
    }

    fn contents_changed(
        &mut self,
        _document: &TextDocument,
        _block: BlockId,
        position: usize,
        removed: usize,
        added: usize,
    ) {
        self.events
            .push(format!("changed {position} -{removed} +{added}"));
    }

    fn block_count_changed(&mut self, _document: &TextDocument, count: usize) {
        self.events.push(format!("count {count}"));
    }
}

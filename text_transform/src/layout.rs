//! Layout of one line group.
//!
//! A line group is the run of visual lines produced from a root block up to
//! the line feed that ends it. Folds can carry a group across several blocks,
//! which then have no lines of their own.
//!
//! [`Layout`] walks the document in position order and yields [`Atom`]s from
//! five interleaved sources, checked in this order at every position:
//!
//! ```text
//! Fold -> Insert -> InlineInsert -> Block -> LineFeed -> End
//!  ^                                  |
//!  +----------------------------------+   (after each text run)
//! ```
//!
//! [`LineBuilder`] turns the atoms into [`Line`]s, applying the wrap rules.

use crate::{
    config::{LayoutConfig, WrapMode},
    line::{FoldId, InsertId, Line, LineElement},
};
use smallvec::SmallVec;
use tome_text::{BlockId, Position, TextDocument};
use unicode_width::UnicodeWidthChar;

/// Visual width of `ch` drawn at column `x`. A zero tab width counts as 1.
pub(crate) fn char_width(ch: char, x: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - x % tab_width
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(1)
    }
}

/// Visual width of `chars` drawn from column `x`.
pub(crate) fn text_width(chars: &[char], x: usize, tab_width: usize) -> usize {
    chars
        .iter()
        .fold(0, |width, &ch| width + char_width(ch, x + width, tab_width))
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FoldSpan {
    pub begin: Position,
    pub end: Position,
    pub id: FoldId,
    pub width: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InsertPoint {
    pub position: Position,
    pub id: InsertId,
    pub width: usize,
}

/// Fold and insert anchors resolved to positions, sorted for one relayout.
#[derive(Debug, Default)]
pub(crate) struct Anchors {
    pub folds: Vec<FoldSpan>,
    pub inserts: Vec<InsertPoint>,
    pub inline_inserts: Vec<InsertPoint>,
}

impl Anchors {
    pub fn sort(&mut self) {
        // Outer folds first when two start together.
        self.folds
            .sort_by(|a, b| a.begin.cmp(&b.begin).then(b.end.cmp(&a.end)));
        self.inserts.sort_by_key(|insert| (insert.position, insert.id));
        self.inline_inserts.sort_by_key(|insert| (insert.position, insert.id));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fold,
    Insert,
    InlineInsert,
    Block,
    LineFeed,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Atom {
    Fold { id: FoldId, width: usize },
    Insert { id: InsertId, width: usize, column: usize },
    InlineInsert { id: InsertId, width: usize },
    /// `length` characters of the current block from `start`.
    Text { start: usize, length: usize },
    LineFeed,
}

pub(crate) struct Layout<'a> {
    document: &'a TextDocument,
    anchors: &'a Anchors,
    wrap_mode: WrapMode,
    state: State,
    block: BlockId,
    chars: Vec<char>,
    position: Position,
    next_fold: usize,
    next_insert: usize,
    next_inline_insert: usize,
    covered: Vec<BlockId>,
}

impl<'a> Layout<'a> {
    pub fn new(
        document: &'a TextDocument,
        anchors: &'a Anchors,
        wrap_mode: WrapMode,
        root: BlockId,
        line: usize,
    ) -> Self {
        let position = Position::new(line, 0);
        Self {
            document,
            anchors,
            wrap_mode,
            state: State::Fold,
            block: root,
            chars: Self::chars_of(document, root),
            position,
            next_fold: anchors.folds.partition_point(|fold| fold.begin < position),
            next_insert: anchors.inserts.partition_point(|insert| insert.position < position),
            next_inline_insert: anchors
                .inline_inserts
                .partition_point(|insert| insert.position < position),
            covered: vec![root],
        }
    }

    fn chars_of(document: &TextDocument, block: BlockId) -> Vec<char> {
        document
            .block(block)
            .map(|block| block.content().chars().collect())
            .unwrap_or_default()
    }

    /// Block the layout is currently in.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Document line of [`Layout::block`].
    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Blocks visited so far, the root first.
    pub fn into_covered(self) -> Vec<BlockId> {
        self.covered
    }

    pub fn next_atom(&mut self) -> Option<Atom> {
        loop {
            match self.state {
                State::Fold => {
                    self.state = State::Insert;
                    let folds = &self.anchors.folds;
                    while let Some(fold) = folds.get(self.next_fold) {
                        if fold.begin >= self.position && fold.begin < fold.end {
                            break;
                        }
                        self.next_fold += 1;
                    }
                    if let Some(&fold) = folds.get(self.next_fold) {
                        if fold.begin == self.position {
                            self.next_fold += 1;
                            self.jump_to(fold.end);
                            self.state = State::Fold;
                            return Some(Atom::Fold {
                                id: fold.id,
                                width: fold.width,
                            });
                        }
                    }
                },
                State::Insert => {
                    self.state = State::InlineInsert;
                    let inserts = &self.anchors.inserts;
                    while inserts
                        .get(self.next_insert)
                        .is_some_and(|insert| insert.position < self.position)
                    {
                        self.next_insert += 1;
                    }
                    if let Some(&insert) = inserts.get(self.next_insert) {
                        if insert.position == self.position {
                            self.next_insert += 1;
                            self.state = State::Insert;
                            return Some(Atom::Insert {
                                id: insert.id,
                                width: insert.width,
                                column: insert.position.column,
                            });
                        }
                    }
                },
                State::InlineInsert => {
                    self.state = State::Block;
                    let inserts = &self.anchors.inline_inserts;
                    while inserts
                        .get(self.next_inline_insert)
                        .is_some_and(|insert| insert.position < self.position)
                    {
                        self.next_inline_insert += 1;
                    }
                    if let Some(&insert) = inserts.get(self.next_inline_insert) {
                        if insert.position == self.position {
                            self.next_inline_insert += 1;
                            self.state = State::InlineInsert;
                            return Some(Atom::InlineInsert {
                                id: insert.id,
                                width: insert.width,
                            });
                        }
                    }
                },
                State::Block => {
                    let start = self.position.column;
                    if start < self.chars.len() {
                        let end = self.run_end();
                        self.position.column = end;
                        self.state = State::Fold;
                        return Some(Atom::Text {
                            start,
                            length: end - start,
                        });
                    }
                    self.state = State::LineFeed;
                },
                State::LineFeed => {
                    self.state = State::End;
                    return Some(Atom::LineFeed);
                },
                State::End => return None,
            }
        }
    }

    /// End column of the run starting at the current position.
    ///
    /// Only valid in [`State::Block`], where every anchor index already
    /// points past the current position.
    fn run_end(&self) -> usize {
        let start = self.position.column;
        let line = self.position.line;
        let on_this_line = |position: Position| (position.line == line).then_some(position.column);
        let limit = [
            self.anchors.folds.get(self.next_fold).map(|fold| fold.begin),
            self.anchors.inserts.get(self.next_insert).map(|insert| insert.position),
            self.anchors
                .inline_inserts
                .get(self.next_inline_insert)
                .map(|insert| insert.position),
        ]
        .into_iter()
        .flatten()
        .filter_map(on_this_line)
        .filter(|&column| column > start)
        .fold(self.chars.len(), usize::min);

        match self.wrap_mode {
            WrapMode::NoWrap => limit,
            WrapMode::Anywhere => start + 1,
            WrapMode::Word | WrapMode::WordBoundaryOrAnywhere => {
                let whitespace = self.chars[start].is_whitespace();
                let mut end = start + 1;
                while end < limit && self.chars[end].is_whitespace() == whitespace {
                    end += 1;
                }
                end
            },
        }
    }

    /// Skip to `target`, pulling the blocks passed over into the group.
    fn jump_to(&mut self, target: Position) {
        let mut moved = false;
        while self.position.line < target.line {
            let Some(next) = self.document.next_block(self.block) else {
                break;
            };
            self.block = next;
            self.covered.push(next);
            self.position.line += 1;
            moved = true;
        }
        if moved {
            self.chars = Self::chars_of(self.document, self.block);
        }
        self.position.column = target.column.min(self.chars.len());
    }
}

/// Assembles the lines of one group from [`Atom`]s.
pub(crate) struct LineBuilder<'c> {
    config: &'c LayoutConfig,
    root: BlockId,
    lines: Vec<Line>,
    elements: SmallVec<[LineElement; 4]>,
    x: usize,
    has_content: bool,
    /// A row insert split a block; an empty tail line is not kept.
    after_split_insert: bool,
}

impl<'c> LineBuilder<'c> {
    pub fn new(config: &'c LayoutConfig, root: BlockId) -> Self {
        Self {
            config,
            root,
            lines: Vec::new(),
            elements: SmallVec::new(),
            x: 0,
            has_content: false,
            after_split_insert: false,
        }
    }

    pub fn push(&mut self, atom: Atom, block: BlockId, chars: &[char]) {
        match atom {
            Atom::Fold { id, width } => self.place_box(LineElement::Fold { id, width }),
            Atom::InlineInsert { id, width } => {
                self.place_box(LineElement::InlineInsert { id, width })
            },
            Atom::Insert { id, width, column } => self.place_row(id, width, column > 0),
            Atom::Text { start, length } => self.place_text(block, start, &chars[start..start + length]),
            Atom::LineFeed => {
                if !(self.elements.is_empty() && self.after_split_insert) {
                    self.finish_line();
                }
            },
        }
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }

    fn fits(&self, width: usize) -> bool {
        self.config
            .wrap_width()
            .map_or(true, |limit| self.x + width <= limit)
    }

    fn finish_line(&mut self) {
        let wrap_index = self.lines.len();
        self.lines.push(Line {
            elements: std::mem::take(&mut self.elements),
            width: self.x,
            root: self.root,
            wrap_index,
        });
        self.x = 0;
        self.has_content = false;
    }

    fn wrap(&mut self) {
        self.elements.push(LineElement::CarriageReturn);
        self.finish_line();
        let indent = self.config.continuation_indent;
        self.elements.push(LineElement::LineIndent { width: indent });
        self.x = indent;
    }

    fn append(&mut self, element: LineElement) {
        self.x += element.width();
        self.has_content = true;
        self.after_split_insert = false;
        self.elements.push(element);
    }

    fn place_box(&mut self, element: LineElement) {
        if self.has_content && !self.fits(element.width()) {
            self.wrap();
        }
        self.append(element);
    }

    fn place_row(&mut self, id: InsertId, width: usize, splits_block: bool) {
        if self.has_content {
            self.elements.push(LineElement::CarriageReturn);
            self.finish_line();
        } else {
            self.elements.clear();
            self.x = 0;
        }
        self.append(LineElement::Insert { id, width });
        self.finish_line();
        self.after_split_insert = splits_block;
    }

    fn place_text(&mut self, block: BlockId, start: usize, chars: &[char]) {
        let tab_width = self.config.tab_width;
        if self.fits(text_width(chars, self.x, tab_width)) {
            self.append_fragment(block, start, chars);
            return;
        }
        if self.has_content {
            self.wrap();
            if self.fits(text_width(chars, self.x, tab_width)) {
                self.append_fragment(block, start, chars);
                return;
            }
        }

        // The run does not fit on a line of its own.
        match self.config.wrap_mode {
            WrapMode::Anywhere | WrapMode::WordBoundaryOrAnywhere => {
                for (offset, ch) in chars.iter().enumerate() {
                    if self.has_content && !self.fits(char_width(*ch, self.x, tab_width)) {
                        self.wrap();
                    }
                    self.append_fragment(block, start + offset, std::slice::from_ref(ch));
                }
            },
            WrapMode::NoWrap | WrapMode::Word => self.append_fragment(block, start, chars),
        }
    }

    fn append_fragment(&mut self, block: BlockId, start: usize, chars: &[char]) {
        let width = text_width(chars, self.x, self.config.tab_width);
        if let Some(LineElement::BlockFragment {
            block: last_block,
            start_column,
            length,
            width: last_width,
        }) = self.elements.last_mut()
        {
            if *last_block == block && *start_column + *length == start {
                *length += chars.len();
                *last_width += width;
                self.x += width;
                self.has_content = true;
                self.after_split_insert = false;
                return;
            }
        }
        self.append(LineElement::BlockFragment {
            block,
            start_column: start,
            length: chars.len(),
            width,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_advance_to_next_stop() {
        assert_eq!(char_width('\t', 0, 4), 4);
        assert_eq!(char_width('\t', 1, 4), 3);
        assert_eq!(char_width('\t', 4, 4), 4);
        assert_eq!(text_width(&['a', '\t', 'b'], 0, 4), 5);
        assert_eq!(text_width(&['a', '\t', 'b'], 2, 4), 3);
    }

    #[test]
    fn zero_tab_width_counts_as_one() {
        assert_eq!(char_width('\t', 0, 0), 1);
        assert_eq!(char_width('\t', 7, 0), 1);
        assert_eq!(text_width(&['\t', '\t'], 3, 0), 2);
    }

    #[test]
    fn wide_characters_take_two_columns() {
        assert_eq!(char_width('漢', 0, 4), 2);
        assert_eq!(text_width(&['a', '漢'], 0, 4), 3);
    }

    fn atoms(document: &TextDocument, anchors: &Anchors, mode: WrapMode) -> Vec<Atom> {
        let mut layout = Layout::new(document, anchors, mode, document.first_block(), 0);
        std::iter::from_fn(|| layout.next_atom()).collect()
    }

    #[test]
    fn word_runs_alternate_with_whitespace() {
        let document = TextDocument::from_text("ab  cd");
        let anchors = Anchors::default();
        assert_eq!(
            atoms(&document, &anchors, WrapMode::Word),
            vec![
                Atom::Text { start: 0, length: 2 },
                Atom::Text { start: 2, length: 2 },
                Atom::Text { start: 4, length: 2 },
                Atom::LineFeed,
            ]
        );
        assert_eq!(
            atoms(&document, &anchors, WrapMode::NoWrap),
            vec![Atom::Text { start: 0, length: 6 }, Atom::LineFeed]
        );
        assert_eq!(atoms(&document, &anchors, WrapMode::Anywhere).len(), 7);
    }

    #[test]
    fn fold_jumps_to_its_end() {
        let document = TextDocument::from_text("abcdef\nghij\nkl");
        let mut anchors = Anchors {
            folds: vec![FoldSpan {
                begin: Position::new(0, 2),
                end: Position::new(1, 3),
                id: FoldId(1),
                width: 3,
            }],
            ..Anchors::default()
        };
        anchors.sort();
        let mut layout = Layout::new(&document, &anchors, WrapMode::NoWrap, document.first_block(), 0);
        let produced: Vec<Atom> = std::iter::from_fn(|| layout.next_atom()).collect();
        assert_eq!(
            produced,
            vec![
                Atom::Text { start: 0, length: 2 },
                Atom::Fold { id: FoldId(1), width: 3 },
                Atom::Text { start: 3, length: 1 },
                Atom::LineFeed,
            ]
        );
        assert_eq!(layout.line(), 1);
        assert_eq!(layout.into_covered().len(), 2);
    }

    #[test]
    fn inserts_come_before_text_at_their_position() {
        let document = TextDocument::from_text("abcd");
        let anchors = Anchors {
            inserts: vec![InsertPoint {
                position: Position::new(0, 0),
                id: InsertId(1),
                width: 5,
            }],
            inline_inserts: vec![InsertPoint {
                position: Position::new(0, 2),
                id: InsertId(2),
                width: 1,
            }],
            ..Anchors::default()
        };
        assert_eq!(
            atoms(&document, &anchors, WrapMode::NoWrap),
            vec![
                Atom::Insert { id: InsertId(1), width: 5, column: 0 },
                Atom::Text { start: 0, length: 2 },
                Atom::InlineInsert { id: InsertId(2), width: 1 },
                Atom::Text { start: 2, length: 2 },
                Atom::LineFeed,
            ]
        );
    }
}

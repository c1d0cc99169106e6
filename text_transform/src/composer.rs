//! Incremental projection of document blocks into visual lines.
//!
//! The [`Composer`] keeps three structures in step with the document:
//!
//! - `lines`: every visual line, top to bottom
//! - `shadow`: per block, the root of its line group and where that group
//!   starts in `lines`
//! - the folds and inserts, each anchored by a document cursor so the
//!   document moves them along with edits
//!
//! # Relayout
//!
//! Every change relayouts from the root of the first affected group and
//! keeps going group by group until it has passed the last affected block
//! and reaches a block that was a root before the change. The lines of the
//! old groups in between are spliced out and replaced:
//!
//! ```text
//!            before              after (fold added on block 1..2)
//! block 0 -> line 0              line 0
//! block 1 -> line 1   <- from    line 1  [text][fold][text]
//! block 2 -> line 2   <- last    (hidden in block 1's group)
//! block 3 -> line 3   <- stop    line 2
//! ```
//!
//! Only [`Composer::set_config`] lays out the whole document again.
//!
//! # Related
//!
//! - [`crate::layout`] builds the lines of one group
//! - [`crate::TextView`] registers a composer as a document listener

use crate::{
    config::LayoutConfig,
    error::{Result, TextSnafu, UnknownFoldSnafu, UnknownInsertSnafu},
    layout::{char_width, Anchors, FoldSpan, InsertPoint, Layout, LineBuilder},
    line::{FoldId, InsertId, Line, LineElement, StyledRun},
};
use rustc_hash::FxHashMap;
use snafu::{OptionExt, ResultExt};
use std::ops::Range;
use tome_text::{BlockId, CursorId, DocumentListener, MoveMode, Position, TextDocument};

/// Where a block's line group lives in the line list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShadowBlock {
    /// First block of the group; the block itself unless hidden by a fold.
    root: BlockId,
    first_line: usize,
    line_count: usize,
}

#[derive(Debug)]
struct Fold {
    /// Anchor at the fold start, position at its end.
    cursor: CursorId,
    width: usize,
}

#[derive(Debug)]
struct Insert {
    cursor: CursorId,
    width: usize,
    payload: u64,
}

/// One laid out group, before its lines are spliced in.
struct Group {
    lines: Vec<Line>,
    blocks: Vec<BlockId>,
    last: BlockId,
    last_line: usize,
}

pub struct Composer {
    config: LayoutConfig,
    lines: Vec<Line>,
    shadow: FxHashMap<BlockId, ShadowBlock>,
    folds: FxHashMap<FoldId, Fold>,
    inserts: FxHashMap<InsertId, Insert>,
    inline_inserts: FxHashMap<InsertId, Insert>,
    next_id: u64,
    /// Index and width of the widest line.
    longest: Option<(usize, usize)>,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("lines", &self.lines.len())
            .field("folds", &self.folds.len())
            .field("inserts", &(self.inserts.len() + self.inline_inserts.len()))
            .field("longest", &self.longest)
            .finish()
    }
}

impl Composer {
    /// Lay out `document` from scratch.
    ///
    /// The composer does not follow later edits by itself; register it as a
    /// listener, or use [`crate::TextView`] which does.
    pub fn new(document: &TextDocument, config: LayoutConfig) -> Self {
        let mut composer = Self {
            config,
            lines: Vec::new(),
            shadow: FxHashMap::default(),
            folds: FxHashMap::default(),
            inserts: FxHashMap::default(),
            inline_inserts: FxHashMap::default(),
            next_id: 1,
            longest: None,
        };
        composer.layout_all(document);
        composer
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the layout parameters and lay everything out again.
    pub fn set_config(&mut self, document: &TextDocument, config: LayoutConfig) {
        self.config = config;
        self.layout_all(document);
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Number of visual lines.
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn longest_line_width(&self) -> usize {
        self.longest.map_or(0, |(_, width)| width)
    }

    pub fn longest_line(&self) -> Option<usize> {
        self.longest.map(|(index, _)| index)
    }

    /// Visual lines of the group `block` belongs to.
    ///
    /// A block hidden inside a fold reports the lines of the group that hides
    /// it.
    pub fn block_lines(&self, block: BlockId) -> Option<Range<usize>> {
        let shadow = self.shadow.get(&block)?;
        let root = self.shadow.get(&shadow.root)?;
        Some(root.first_line..root.first_line + root.line_count)
    }

    /// Root block of the group containing `block`.
    pub fn root_of(&self, block: BlockId) -> Option<BlockId> {
        self.shadow.get(&block).map(|shadow| shadow.root)
    }

    // Folds

    /// Collapse `begin..end` into a placeholder of the configured fold width.
    pub fn add_fold(
        &mut self,
        document: &mut TextDocument,
        begin: Position,
        end: Position,
    ) -> Result<FoldId> {
        let width = self.config.fold_width;
        self.add_fold_with_width(document, begin, end, width)
    }

    pub fn add_fold_with_width(
        &mut self,
        document: &mut TextDocument,
        begin: Position,
        end: Position,
        width: usize,
    ) -> Result<FoldId> {
        let cursor = document.create_cursor();
        {
            let mut handle = document.cursor(cursor).context(TextSnafu)?;
            handle.set_position(begin, MoveMode::Move);
            handle.set_position(end, MoveMode::KeepAnchor);
        }
        let id = FoldId(self.allocate_id());
        self.folds.insert(id, Fold { cursor, width });
        let span = document.cursor_selection(cursor).context(TextSnafu)?;
        tracing::debug!("fold {id:?} added over {}..{}", span.begin, span.end);
        self.relayout_lines(document, span.begin.line, span.end.line);
        Ok(id)
    }

    pub fn remove_fold(&mut self, document: &mut TextDocument, id: FoldId) -> Result<()> {
        let fold = self.folds.remove(&id).context(UnknownFoldSnafu { id })?;
        let span = document.cursor_selection(fold.cursor).context(TextSnafu)?;
        document.destroy_cursor(fold.cursor).context(TextSnafu)?;
        tracing::debug!("fold {id:?} removed from {}..{}", span.begin, span.end);
        self.relayout_lines(document, span.begin.line, span.end.line);
        Ok(())
    }

    /// Current extent of a fold, following edits made since it was added.
    pub fn fold_range(&self, document: &TextDocument, id: FoldId) -> Result<tome_text::Range> {
        let fold = self.folds.get(&id).context(UnknownFoldSnafu { id })?;
        document.cursor_selection(fold.cursor).context(TextSnafu)
    }

    pub fn folds(&self) -> impl Iterator<Item = FoldId> + '_ {
        self.folds.keys().copied()
    }

    // Inserts

    /// Reserve a full row of `width` columns at `position`.
    ///
    /// An insert in the middle of a block breaks the block's text around its
    /// row. `payload` is handed back unchanged by [`Composer::insert_payload`].
    pub fn add_insert(
        &mut self,
        document: &mut TextDocument,
        position: Position,
        width: usize,
        payload: u64,
    ) -> Result<InsertId> {
        let (id, line) = self.anchor_insert(document, position, width, payload, false)?;
        self.relayout_lines(document, line, line);
        Ok(id)
    }

    /// Reserve `width` columns inside the text line at `position`.
    pub fn add_inline_insert(
        &mut self,
        document: &mut TextDocument,
        position: Position,
        width: usize,
        payload: u64,
    ) -> Result<InsertId> {
        let (id, line) = self.anchor_insert(document, position, width, payload, true)?;
        self.relayout_lines(document, line, line);
        Ok(id)
    }

    /// Remove a row or inline insert, returning its payload.
    pub fn remove_insert(&mut self, document: &mut TextDocument, id: InsertId) -> Result<u64> {
        let insert = match self.inserts.remove(&id) {
            Some(insert) => insert,
            None => self.inline_inserts.remove(&id).context(UnknownInsertSnafu { id })?,
        };
        let position = document.cursor_position(insert.cursor).context(TextSnafu)?;
        document.destroy_cursor(insert.cursor).context(TextSnafu)?;
        tracing::debug!("insert {id:?} removed from {position}");
        self.relayout_lines(document, position.line, position.line);
        Ok(insert.payload)
    }

    pub fn insert_payload(&self, id: InsertId) -> Option<u64> {
        self.inserts
            .get(&id)
            .or_else(|| self.inline_inserts.get(&id))
            .map(|insert| insert.payload)
    }

    pub fn insert_position(&self, document: &TextDocument, id: InsertId) -> Result<Position> {
        let insert = self
            .inserts
            .get(&id)
            .or_else(|| self.inline_inserts.get(&id))
            .context(UnknownInsertSnafu { id })?;
        document.cursor_position(insert.cursor).context(TextSnafu)
    }

    fn anchor_insert(
        &mut self,
        document: &mut TextDocument,
        position: Position,
        width: usize,
        payload: u64,
        inline: bool,
    ) -> Result<(InsertId, usize)> {
        let cursor = document.create_cursor();
        document
            .cursor(cursor)
            .context(TextSnafu)?
            .set_position(position, MoveMode::Move);
        let anchored = document.cursor_position(cursor).context(TextSnafu)?;
        let id = InsertId(self.allocate_id());
        let insert = Insert {
            cursor,
            width,
            payload,
        };
        if inline {
            self.inline_inserts.insert(id, insert);
        } else {
            self.inserts.insert(id, insert);
        }
        tracing::debug!("insert {id:?} anchored at {anchored}, inline: {inline}");
        Ok((id, anchored.line))
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Deregister every fold and insert anchor from `document`.
    pub fn release(&mut self, document: &mut TextDocument) -> Result<()> {
        let cursors: Vec<CursorId> = self
            .folds
            .drain()
            .map(|(_, fold)| fold.cursor)
            .chain(self.inserts.drain().map(|(_, insert)| insert.cursor))
            .chain(self.inline_inserts.drain().map(|(_, insert)| insert.cursor))
            .collect();
        for cursor in cursors {
            document.destroy_cursor(cursor).context(TextSnafu)?;
        }
        self.layout_all(document);
        Ok(())
    }

    // Rendering support

    /// Split a [`LineElement::BlockFragment`] into runs of equal format.
    ///
    /// Empty for any other element, or for indices out of range.
    pub fn fragments(&self, document: &TextDocument, line: usize, element: usize) -> Vec<StyledRun> {
        let Some(&LineElement::BlockFragment {
            block,
            start_column,
            length,
            ..
        }) = self.lines.get(line).and_then(|line| line.elements.get(element))
        else {
            return Vec::new();
        };
        let Some(block) = document.block(block) else {
            return Vec::new();
        };
        let chars: Vec<char> = block.content().chars().collect();
        let end = (start_column + length).min(chars.len());
        let text = |from: usize, to: usize| chars[from..to].iter().collect::<String>();

        let mut runs = Vec::new();
        let mut column = start_column;
        for range in block.formats() {
            let range_end = range.start + range.length;
            if range_end <= column || range.start >= end {
                continue;
            }
            if range.start > column {
                runs.push(StyledRun {
                    format: None,
                    text: text(column, range.start),
                });
                column = range.start;
            }
            let run_end = range_end.min(end);
            runs.push(StyledRun {
                format: Some(range.format),
                text: text(column, run_end),
            });
            column = run_end;
        }
        if column < end {
            runs.push(StyledRun {
                format: None,
                text: text(column, end),
            });
        }
        runs
    }

    /// Plain text of a visual line: tabs expanded, folds drawn as dots and
    /// inserts left blank.
    pub fn render_line(&self, document: &TextDocument, index: usize) -> Option<String> {
        let line = self.lines.get(index)?;
        let tab_width = self.config.tab_width;
        let mut rendered = String::new();
        let mut x = 0;
        for element in &line.elements {
            match *element {
                LineElement::BlockFragment {
                    block,
                    start_column,
                    length,
                    ..
                } => {
                    let content = document.block(block)?.content();
                    for ch in content.chars().skip(start_column).take(length) {
                        let width = char_width(ch, x, tab_width);
                        if ch == '\t' {
                            rendered.extend(std::iter::repeat(' ').take(width));
                        } else {
                            rendered.push(ch);
                        }
                        x += width;
                    }
                },
                LineElement::Fold { width, .. } => {
                    rendered.extend(std::iter::repeat('.').take(width));
                    x += width;
                },
                LineElement::Insert { width, .. }
                | LineElement::InlineInsert { width, .. }
                | LineElement::LineIndent { width } => {
                    rendered.extend(std::iter::repeat(' ').take(width));
                    x += width;
                },
                LineElement::CarriageReturn => {},
            }
        }
        Some(rendered)
    }

    /// Visual line and x offset of the caret at `position`.
    ///
    /// A position inside a fold maps to the fold placeholder.
    pub fn visual_position(
        &self,
        document: &TextDocument,
        position: Position,
    ) -> Option<(usize, usize)> {
        let position = document.clamp(position);
        let block = document.block_at(position.line)?;
        let lines = self.block_lines(block)?;
        let folded: Vec<(FoldId, tome_text::Range)> = self
            .folds
            .iter()
            .filter_map(|(&id, fold)| Some((id, document.cursor_selection(fold.cursor).ok()?)))
            .filter(|(_, span)| span.begin < position && position < span.end)
            .collect();
        let content: Vec<char> = document.block(block)?.content().chars().collect();
        let tab_width = self.config.tab_width;

        let mut fallback = None;
        for index in lines.clone() {
            let mut x = 0;
            for element in &self.lines[index].elements {
                match *element {
                    LineElement::BlockFragment {
                        block: fragment_block,
                        start_column,
                        length,
                        width,
                    } if fragment_block == block => {
                        let column = position.column;
                        if (start_column..start_column + length).contains(&column) {
                            let offset = crate::layout::text_width(
                                &content[start_column..column],
                                x,
                                tab_width,
                            );
                            return Some((index, x + offset));
                        }
                        if column == start_column + length {
                            fallback = Some((index, x + width));
                        }
                    },
                    LineElement::Fold { id, .. } if folded.iter().any(|(fold, _)| *fold == id) => {
                        return Some((index, x));
                    },
                    _ => {},
                }
                x += element.width();
            }
        }
        fallback.or_else(|| {
            let last = lines.end.checked_sub(1)?;
            Some((last, self.lines[last].width))
        })
    }

    // Layout

    fn layout_all(&mut self, document: &TextDocument) {
        self.lines.clear();
        self.shadow.clear();
        self.longest = None;
        self.relayout(document, document.first_block(), document.last_block());
        tracing::debug!("full layout: {} lines", self.lines.len());
    }

    fn relayout_lines(&mut self, document: &TextDocument, first: usize, last: usize) {
        let (Some(from), Some(to)) = (document.block_at(first), document.block_at(last)) else {
            return;
        };
        self.relayout(document, from, to);
    }

    fn anchors(&self, document: &TextDocument) -> Anchors {
        let mut anchors = Anchors::default();
        for (&id, fold) in &self.folds {
            if let Ok(span) = document.cursor_selection(fold.cursor) {
                anchors.folds.push(FoldSpan {
                    begin: span.begin,
                    end: span.end,
                    id,
                    width: fold.width,
                });
            }
        }
        let points = |inserts: &FxHashMap<InsertId, Insert>| -> Vec<InsertPoint> {
            inserts
                .iter()
                .filter_map(|(&id, insert)| {
                    Some(InsertPoint {
                        position: document.cursor_position(insert.cursor).ok()?,
                        id,
                        width: insert.width,
                    })
                })
                .collect()
        };
        anchors.inserts = points(&self.inserts);
        anchors.inline_inserts = points(&self.inline_inserts);
        anchors.sort();
        anchors
    }

    /// Root of the group `block` belongs to, or of the group before it for a
    /// block that has not been laid out yet.
    fn group_start(&self, document: &TextDocument, block: BlockId) -> BlockId {
        let mut current = block;
        loop {
            if let Some(shadow) = self.shadow.get(&current) {
                if self
                    .shadow
                    .get(&shadow.root)
                    .is_some_and(|root| root.root == shadow.root)
                {
                    return shadow.root;
                }
            }
            match document.previous_block(current) {
                Some(previous) => current = previous,
                None => return current,
            }
        }
    }

    fn layout_group(
        &self,
        document: &TextDocument,
        anchors: &Anchors,
        root: BlockId,
        line: usize,
    ) -> Group {
        let mut layout = Layout::new(document, anchors, self.config.wrap_mode, root, line);
        let mut builder = LineBuilder::new(&self.config, root);
        while let Some(atom) = layout.next_atom() {
            builder.push(atom, layout.block(), layout.chars());
        }
        let last = layout.block();
        let last_line = layout.line();
        Group {
            lines: builder.into_lines(),
            blocks: layout.into_covered(),
            last,
            last_line,
        }
    }

    /// Lay out again every group from the one containing `from` until past
    /// `last`, stopping at the first block that was already a group root.
    fn relayout(&mut self, document: &TextDocument, from: BlockId, last: BlockId) {
        if document.block(from).map_or(true, |block| block.is_garbage()) {
            return;
        }
        let start = self.group_start(document, from);
        let Some(mut line) = document.line_of(start) else {
            return;
        };
        let old_first = self
            .shadow
            .get(&start)
            .map_or(0, |shadow| shadow.first_line)
            .min(self.lines.len());
        let anchors = self.anchors(document);

        let mut lines = Vec::new();
        let mut assignments = Vec::new();
        let mut passed_last = false;
        let mut root = start;
        let old_end = loop {
            let group = self.layout_group(document, &anchors, root, line);
            let offset = lines.len();
            let count = group.lines.len();
            for &block in &group.blocks {
                passed_last |= block == last;
                assignments.push((
                    block,
                    ShadowBlock {
                        root,
                        first_line: offset,
                        line_count: count,
                    },
                ));
            }
            lines.extend(group.lines);
            line = group.last_line + 1;

            let Some(next) = document.next_block(group.last) else {
                break self.lines.len();
            };
            if passed_last {
                if let Some(shadow) = self.shadow.get(&next) {
                    if shadow.root == next {
                        break shadow.first_line;
                    }
                }
            }
            root = next;
        };
        let old_end = old_end.clamp(old_first, self.lines.len());

        tracing::trace!(
            "relayout lines {old_first}..{old_end} -> {} lines over {} blocks",
            lines.len(),
            assignments.len()
        );
        self.splice_lines(old_first..old_end, lines);
        for (block, mut shadow) in assignments {
            shadow.first_line += old_first;
            self.shadow.insert(block, shadow);
        }
    }

    /// Replace `range` of the line list, shifting the groups after it and
    /// keeping the widest line up to date.
    fn splice_lines(&mut self, range: Range<usize>, lines: Vec<Line>) {
        let removed = range.len();
        let added = lines.len();
        let fresh = lines
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (offset, line)| match best {
                Some((_, width)) if width >= line.width => best,
                _ => Some((range.start + offset, line.width)),
            });
        let touched = self
            .longest
            .is_some_and(|(index, _)| range.contains(&index));

        self.lines.splice(range.clone(), lines);
        if removed != added {
            for shadow in self.shadow.values_mut() {
                if shadow.first_line >= range.end {
                    shadow.first_line = shadow.first_line - removed + added;
                }
            }
        }

        self.longest = match (self.longest, fresh) {
            (Some((_, width)), Some(new)) if touched && new.1 >= width => Some(new),
            (Some(_), _) if touched => self.scan_longest(),
            (Some((index, width)), fresh) => {
                let index = if index >= range.end {
                    index - removed + added
                } else {
                    index
                };
                match fresh {
                    Some(new) if new.1 > width => Some(new),
                    _ => Some((index, width)),
                }
            },
            (None, fresh) => fresh,
        };
    }

    fn scan_longest(&self) -> Option<(usize, usize)> {
        tracing::trace!("longest line replaced, rescanning widths");
        self.lines
            .iter()
            .enumerate()
            .fold(None, |best, (index, line)| match best {
                Some((_, width)) if width >= line.width => best,
                _ => Some((index, line.width)),
            })
    }

    /// Drop the lines of a destroyed block and lay out its neighbourhood.
    fn forget_block(&mut self, document: &TextDocument, line: usize, block: BlockId) {
        if let Some(shadow) = self.shadow.remove(&block) {
            if shadow.root == block {
                let first = shadow.first_line.min(self.lines.len());
                let end = (shadow.first_line + shadow.line_count).min(self.lines.len());
                self.splice_lines(first..end, Vec::new());
            }
        }
        if let Some(previous) = document.block_at(line.saturating_sub(1)) {
            self.relayout(document, previous, previous);
        }
    }
}

impl DocumentListener for Composer {
    fn block_inserted(&mut self, document: &TextDocument, _position: Position, block: BlockId) {
        self.relayout(document, block, block);
    }

    fn block_destroyed(&mut self, document: &TextDocument, line: usize, block: BlockId) {
        self.forget_block(document, line, block);
    }

    fn contents_changed(
        &mut self,
        document: &TextDocument,
        block: BlockId,
        _position: usize,
        _removed: usize,
        _added: usize,
    ) {
        self.relayout(document, block, block);
    }
}

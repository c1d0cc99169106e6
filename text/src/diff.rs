//! Edit diffs and their merge algebra.
//!
//! A [`TextDiff`] is the net effect of a sequence of edits, expressed against
//! the text as it was before the first of them. Edits are merged in one at a
//! time with [`TextDiff::add_insertion`] and [`TextDiff::add_removal`], each
//! addressed in the coordinates of the text at the moment of the edit. How a
//! new edit interacts with what is already recorded is decided by
//! [`Range::compare`] between the edit and the current span of each recorded
//! change.
//!
//! The diff is kept in canonical form: changes are sorted by position, a
//! removal and an insertion at the same point are paired, and two changes are
//! always separated by at least one character of untouched text. Changes that
//! touch are coalesced, and changes that cancel out disappear.
//!
//! # Related
//!
//! - [`crate::TextDocument`] records one diff per transaction and replays
//!   [`TextDiff::inverted`] for undo
//! - [`TextDiff::take_first`] splits a diff into independently applicable edits

use crate::{
    point::{byte_index, char_offset, Position},
    range::{Range, RangeRelation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    Insertion,
    Removal,
}

impl DiffKind {
    pub fn inverse(self) -> Self {
        match self {
            DiffKind::Insertion => DiffKind::Removal,
            DiffKind::Removal => DiffKind::Insertion,
        }
    }
}

/// Text anchored at a document position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRange {
    pub position: Position,
    pub text: String,
}

impl TextRange {
    pub fn new(position: Position, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }

    /// Position just past the text.
    pub fn end(&self) -> Position {
        self.position.advance(&self.text)
    }

    pub fn range(&self) -> Range {
        Range {
            begin: self.position,
            end: self.end(),
        }
    }
}

/// A single insertion or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub kind: DiffKind,
    pub content: TextRange,
}

impl Diff {
    pub fn insertion(position: Position, text: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Insertion,
            content: TextRange::new(position, text),
        }
    }

    pub fn removal(position: Position, text: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Removal,
            content: TextRange::new(position, text),
        }
    }
}

/// Removal of `removed` at `position`, then insertion of `inserted` at the
/// same point. Either side may be empty, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Hunk {
    position: Position,
    removed: String,
    inserted: String,
}

impl Hunk {
    fn removed_end(&self) -> Position {
        self.position.advance(&self.removed)
    }

    fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty()
    }
}

/// Walks hunks in order, translating between original and current positions
/// in the untouched text between them.
#[derive(Debug, Default, Clone, Copy)]
struct Mapper {
    original: Position,
    current: Position,
}

impl Mapper {
    fn to_current(self, original: Position) -> Position {
        self.current + (original - self.original)
    }

    fn to_original(self, current: Position) -> Position {
        self.original + (current - self.current)
    }

    /// Current span occupied by the hunk's inserted text.
    fn span(self, hunk: &Hunk) -> Range {
        let begin = self.to_current(hunk.position);
        Range {
            begin,
            end: begin.advance(&hunk.inserted),
        }
    }

    fn pass(&mut self, hunk: &Hunk) {
        let span = self.span(hunk);
        self.original = hunk.removed_end();
        self.current = span.end;
    }
}

/// Characters of `text` (which starts at `origin`) between two positions.
fn slice(text: &str, origin: Position, from: Position, to: Position) -> &str {
    let begin = byte_index(text, char_offset(text, origin, from));
    let end = byte_index(text, char_offset(text, origin, to));
    &text[begin..end]
}

/// Net edit of one transaction, see the module docs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDiff {
    hunks: Vec<Hunk>,
}

impl TextDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Number of individual insertions and removals.
    pub fn len(&self) -> usize {
        self.hunks
            .iter()
            .map(|hunk| usize::from(!hunk.removed.is_empty()) + usize::from(!hunk.inserted.is_empty()))
            .sum()
    }

    /// Diffs in position order, in the coordinates of the original text.
    ///
    /// A removal and an insertion at the same position are yielded removal
    /// first.
    pub fn iter(&self) -> impl Iterator<Item = Diff> + '_ {
        self.hunks.iter().flat_map(|hunk| {
            let removal = (!hunk.removed.is_empty())
                .then(|| Diff::removal(hunk.position, hunk.removed.clone()));
            let insertion = (!hunk.inserted.is_empty())
                .then(|| Diff::insertion(hunk.position, hunk.inserted.clone()));
            removal.into_iter().chain(insertion)
        })
    }

    /// Record `text` inserted at `position` (current coordinates).
    pub fn add_insertion(&mut self, position: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        tracing::trace!("merge insertion of {} chars at {position}", text.chars().count());

        let point = Range::point(position);
        let mut map = Mapper::default();
        for index in 0..self.hunks.len() {
            let span = map.span(&self.hunks[index]);
            match point.compare(&span) {
                RangeRelation::After => map.pass(&self.hunks[index]),
                RangeRelation::Before => {
                    let hunk = Hunk {
                        position: map.to_original(position),
                        removed: String::new(),
                        inserted: text.to_string(),
                    };
                    self.hunks.insert(index, hunk);
                    return;
                },
                // Touching, identical or inside: grow the existing insertion.
                _ => {
                    let hunk = &mut self.hunks[index];
                    let offset = char_offset(&hunk.inserted, span.begin, position);
                    let at = byte_index(&hunk.inserted, offset);
                    hunk.inserted.insert_str(at, text);
                    return;
                },
            }
        }

        self.hunks.push(Hunk {
            position: map.to_original(position),
            removed: String::new(),
            inserted: text.to_string(),
        });
    }

    /// Record `text` removed starting at `position` (current coordinates).
    ///
    /// `text` must be exactly the current text at that position.
    pub fn add_removal(&mut self, position: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        tracing::trace!("merge removal of {} chars at {position}", text.chars().count());

        let removal = Range::new(position, position.advance(text));
        let mut map = Mapper::default();
        let mut merged = Hunk {
            position,
            removed: String::new(),
            inserted: String::new(),
        };
        let mut prefix = "";
        let mut suffix = "";
        let mut consumed = removal.begin;
        let mut first = None;
        let mut index = 0;

        while index < self.hunks.len() {
            let hunk = &self.hunks[index];
            let span = map.span(hunk);
            let relation = removal.compare(&span);
            match relation {
                RangeRelation::After => {
                    map.pass(hunk);
                    index += 1;
                    continue;
                },
                RangeRelation::Before => break,
                _ => {},
            }

            if first.is_none() {
                first = Some(index);
                merged.position = match relation {
                    RangeRelation::TouchesBefore
                    | RangeRelation::StartsBeforeEndsInside
                    | RangeRelation::StartsBeforeEndsTogether
                    | RangeRelation::StartsBeforeEndsAfter => map.to_original(removal.begin),
                    _ => hunk.position,
                };
            }

            // Untouched original text swallowed before this hunk.
            if consumed < span.begin {
                merged.removed.push_str(slice(text, removal.begin, consumed, span.begin));
            }
            merged.removed.push_str(&hunk.removed);

            match relation {
                RangeRelation::TouchesAfter
                | RangeRelation::StartsInsideEndsInside
                | RangeRelation::StartsInsideEndsTogether
                | RangeRelation::StartsInsideEndsAfter => {
                    prefix = slice(&hunk.inserted, span.begin, span.begin, removal.begin);
                },
                _ => {},
            }
            match relation {
                RangeRelation::TouchesBefore
                | RangeRelation::StartsBeforeEndsInside
                | RangeRelation::StartsTogetherEndsInside
                | RangeRelation::StartsInsideEndsInside => {
                    suffix = slice(&hunk.inserted, span.begin, removal.end, span.end);
                },
                _ => {},
            }

            consumed = consumed.max(span.end);
            map.pass(hunk);
            index += 1;
        }

        let Some(first) = first else {
            let hunk = Hunk {
                position: map.to_original(removal.begin),
                removed: text.to_string(),
                inserted: String::new(),
            };
            self.hunks.insert(index, hunk);
            return;
        };

        if consumed < removal.end {
            merged.removed.push_str(slice(text, removal.begin, consumed, removal.end));
        }
        merged.inserted = format!("{prefix}{suffix}");

        if merged.is_noop() {
            self.hunks.drain(first..index);
        } else {
            self.hunks.splice(first..index, [merged]);
        }
    }

    /// Strip the common prefix of every paired removal and insertion.
    pub fn simplify(&mut self) {
        for hunk in &mut self.hunks {
            if hunk.removed.is_empty() || hunk.inserted.is_empty() {
                continue;
            }
            let common: usize = hunk
                .removed
                .chars()
                .zip(hunk.inserted.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a.len_utf8())
                .sum();
            if common == 0 {
                continue;
            }
            hunk.position = hunk.position.advance(&hunk.removed[..common]);
            hunk.removed.drain(..common);
            hunk.inserted.drain(..common);
        }
        self.hunks.retain(|hunk| !hunk.is_noop());
    }

    /// Remove and return the earliest diff.
    ///
    /// The remaining diffs are rewritten as if the returned diff had already
    /// been applied, so a diff can be replayed by applying `take_first` results
    /// one after the other.
    pub fn take_first(&mut self) -> Option<Diff> {
        let first = self.hunks.first_mut()?;
        let position = first.position;

        let (diff, from, to, keep_first) = if first.removed.is_empty() {
            let inserted = std::mem::take(&mut first.inserted);
            let to = position.advance(&inserted);
            (Diff::insertion(position, inserted), position, to, false)
        } else {
            let removed = std::mem::take(&mut first.removed);
            let from = position.advance(&removed);
            let keep = !first.inserted.is_empty();
            (Diff::removal(position, removed), from, position, keep)
        };

        if !keep_first {
            self.hunks.remove(0);
        }
        let rest = usize::from(keep_first);
        for hunk in &mut self.hunks[rest..] {
            hunk.position = to + (hunk.position - from);
        }
        Some(diff)
    }

    /// Diff that turns the edited text back into the original.
    pub fn inverted(&self) -> TextDiff {
        let mut map = Mapper::default();
        let hunks = self
            .hunks
            .iter()
            .map(|hunk| {
                let position = map.to_current(hunk.position);
                map.pass(hunk);
                Hunk {
                    position,
                    removed: hunk.inserted.clone(),
                    inserted: hunk.removed.clone(),
                }
            })
            .collect();
        TextDiff { hunks }
    }

    /// Apply the diff to plain text that matches its original coordinates.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        let mut diff = self.clone();
        while let Some(next) = diff.take_first() {
            let begin = byte_index(&out, char_offset(&out, Position::zero(), next.content.position));
            match next.kind {
                DiffKind::Insertion => out.insert_str(begin, &next.content.text),
                DiffKind::Removal => {
                    out.replace_range(begin..begin + next.content.text.len(), "");
                },
            }
        }
        out
    }
}

//! Randomized editing against a plain string model.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tome_text::{AuthorId, CursorId, MoveMode, Position, TextDocument};

const ALPHABET: &[&str] = &["a", "b", "é", " ", "\n", "xy", "z\nw", "\n\n"];

fn position_of(text: &str, offset: usize) -> Position {
    Position::extent_of(&text.chars().take(offset).collect::<String>())
}

fn offset_of(text: &str, position: Position) -> usize {
    let mut current = Position::zero();
    for (index, ch) in text.chars().enumerate() {
        if current >= position {
            return index;
        }
        current = current.advance(&ch.to_string());
    }
    text.chars().count()
}

struct Model {
    chars: Vec<char>,
    cursors: Vec<usize>,
}

impl Model {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn insert(&mut self, at: usize, text: &str) {
        let added = text.chars().count();
        self.chars.splice(at..at, text.chars());
        for cursor in &mut self.cursors {
            if *cursor >= at {
                *cursor += added;
            }
        }
    }

    fn remove(&mut self, begin: usize, end: usize) {
        self.chars.drain(begin..end);
        for cursor in &mut self.cursors {
            if *cursor > end {
                *cursor -= end - begin;
            } else if *cursor > begin {
                *cursor = begin;
            }
        }
    }
}

fn assert_consistent(document: &mut TextDocument, cursors: &[CursorId]) {
    for &id in cursors {
        let cursor = document.cursor(id).unwrap();
        let position = cursor.position();
        let block = cursor.block();
        assert_eq!(document.block_at(position.line), Some(block));
        assert!(position.column <= document.line_length(position.line));
    }
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let original = "fn main() {\n    println!(\"hi\");\n}\n";
    let mut document = TextDocument::from_text(original);
    let mut model = Model {
        chars: original.chars().collect(),
        cursors: Vec::new(),
    };

    let mut cursors = Vec::new();
    for _ in 0..3 {
        let offset = rng.gen_range(0..=model.chars.len());
        let id = document.create_cursor();
        let position = position_of(&model.text(), offset);
        document.cursor(id).unwrap().set_position(position, MoveMode::Move);
        cursors.push(id);
        model.cursors.push(offset);
    }

    let mut snapshots = vec![model.text()];
    for _ in 0..steps {
        let text = model.text();
        let length = model.chars.len();
        match rng.gen_range(0..4) {
            0 => {
                let at = rng.gen_range(0..=length);
                let inserted = ALPHABET[rng.gen_range(0..ALPHABET.len())];
                document.insert_text(position_of(&text, at), inserted);
                model.insert(at, inserted);
            },
            1 if length > 0 => {
                let begin = rng.gen_range(0..length);
                let end = rng.gen_range(begin + 1..=length.min(begin + 12));
                let removed = document.remove_text(position_of(&text, begin), position_of(&text, end));
                assert_eq!(removed, model.chars[begin..end].iter().collect::<String>());
                model.remove(begin, end);
            },
            2 if length > 0 => {
                let at = rng.gen_range(0..length);
                assert!(document.delete_char(position_of(&text, at)));
                model.remove(at, at + 1);
            },
            3 if length > 0 => {
                let at = rng.gen_range(1..=length);
                assert!(document.delete_previous_char(position_of(&text, at)));
                model.remove(at - 1, at);
            },
            _ => continue,
        }

        let text = model.text();
        assert_eq!(document.to_string(), text, "seed {seed}");
        for (&id, &offset) in cursors.iter().zip(&model.cursors) {
            let position = document.cursor_position(id).unwrap();
            assert_eq!(offset_of(&text, position), offset, "seed {seed}");
            assert_eq!(position, position_of(&text, offset), "seed {seed}");
        }
        assert_consistent(&mut document, &cursors);
        snapshots.push(text);
    }

    // Walk the history back to the start and forward again.
    let entries = document.undo_stack().len();
    assert_eq!(entries, snapshots.len() - 1);
    for expected in snapshots.iter().rev().skip(1) {
        document.undo(AuthorId::DEFAULT).unwrap();
        assert_eq!(&document.to_string(), expected, "seed {seed}");
        assert_consistent(&mut document, &cursors);
    }
    assert!(document.undo(AuthorId::DEFAULT).is_err());
    for expected in snapshots.iter().skip(1) {
        document.redo(AuthorId::DEFAULT).unwrap();
        assert_eq!(&document.to_string(), expected, "seed {seed}");
    }

    for id in cursors {
        document.destroy_cursor(id).unwrap();
    }
}

#[test]
fn random_edits_track_model() {
    for seed in 0..40 {
        run(seed, 60);
    }
}

#[test]
fn transaction_undoes_as_one_step() {
    let mut document = TextDocument::from_text("alpha\nbeta");
    let author = AuthorId::new();
    document.begin_transaction(author).unwrap();
    document.insert_text(Position::new(0, 5), " one");
    document.insert_block(Position::new(1, 0));
    document.remove_text(Position::new(0, 0), Position::new(0, 6));
    document.delete_char(Position::new(2, 0));
    document.end_transaction(author).unwrap();
    assert_eq!(document.to_string(), "one\n\neta");
    assert_eq!(document.undo_stack().len(), 1);

    document.undo(author).unwrap();
    assert_eq!(document.to_string(), "alpha\nbeta");
    document.redo(author).unwrap();
    assert_eq!(document.to_string(), "one\n\neta");
}

#[test]
fn retyping_the_same_text_records_nothing() {
    let mut document = TextDocument::from_text("same");
    let author = AuthorId::new();
    document.begin_transaction(author).unwrap();
    let removed = document.remove_text(Position::new(0, 0), Position::new(0, 4));
    document.insert_text(Position::new(0, 0), &removed);
    document.end_transaction(author).unwrap();
    assert!(document.undo_stack().is_empty());
}

#[test]
fn cursor_editing_through_document_handle() {
    let mut document = TextDocument::from_text("Hello !");
    let id = document.create_cursor();
    {
        let mut cursor = document.cursor(id).unwrap();
        cursor.set_position(Position::new(0, 6), MoveMode::Move);
        cursor.insert_text("World");
        assert_eq!(cursor.position(), Position::new(0, 11));
    }
    assert_eq!(document.to_string(), "Hello World!");
    document.undo(AuthorId::DEFAULT).unwrap();
    assert_eq!(document.to_string(), "Hello !");
    assert_eq!(document.cursor_position(id).unwrap(), Position::new(0, 6));
    document.redo(AuthorId::DEFAULT).unwrap();
    assert_eq!(document.to_string(), "Hello World!");
    document.destroy_cursor(id).unwrap();
}

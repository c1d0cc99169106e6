//! Edit scripts.
//!
//! One command per line, positions as `line:column`:
//!
//! ```text
//! # comments and blank lines are skipped
//! insert 0:6 World        text runs to the end of the line; \n \t \\ escapes
//! delete 0:0 0:5
//! split 1:0               insert a line break
//! begin                   group the following edits into one undo step
//! end
//! undo
//! redo
//! ```

use super::parse_position;
use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;
use tome_text::{Contributor, MoveMode, Position, TextDocument, TextError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Insert { at: Position, text: String },
    Delete { begin: Position, end: Position },
    Split { at: Position },
    Begin,
    End,
    Undo,
    Redo,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: '{command}' is missing an argument")]
    MissingArgument { line: usize, command: String },

    #[error("line {line}: {message}")]
    BadPosition { line: usize, message: String },

    #[error("line {line}: {source}")]
    Document {
        line: usize,
        #[source]
        source: TextError,
    },
}

/// Parse a script into steps, paired with their 1-based script line.
pub fn parse(script: &str) -> Result<Vec<(usize, Step)>, ScriptError> {
    let mut steps = Vec::new();
    for (index, raw) in script.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        let mut args = rest.split_whitespace();
        let mut position = || -> Result<Position, ScriptError> {
            let value = args.next().ok_or_else(|| ScriptError::MissingArgument {
                line,
                command: command.to_string(),
            })?;
            parse_position(value).map_err(|message| ScriptError::BadPosition { line, message })
        };

        let step = match command {
            "insert" => {
                let at = position()?;
                let text = rest
                    .trim_start()
                    .split_once(' ')
                    .map(|(_, text)| unescape(text))
                    .unwrap_or_default();
                Step::Insert { at, text }
            },
            "delete" => Step::Delete {
                begin: position()?,
                end: position()?,
            },
            "split" => Step::Split { at: position()? },
            "begin" => Step::Begin,
            "end" => Step::End,
            "undo" => Step::Undo,
            "redo" => Step::Redo,
            other => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: other.to_string(),
                })
            },
        };
        steps.push((line, step));
    }
    Ok(steps)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Apply `steps` to `document` as a single contributor.
pub fn apply(document: &mut TextDocument, steps: &[(usize, Step)]) -> Result<(), ScriptError> {
    let mut contributor = Contributor::new();
    let document_error = |line: usize| move |source: TextError| ScriptError::Document { line, source };

    for (line, step) in steps {
        let line = *line;
        tracing::debug!("script line {line}: {step:?}");
        match step {
            Step::Insert { at, text } => {
                let mut cursor = contributor.cursor(document);
                cursor.set_position(*at, MoveMode::Move);
                cursor.insert_text(text);
            },
            Step::Delete { begin, end } => {
                let mut cursor = contributor.cursor(document);
                cursor.set_position(*begin, MoveMode::Move);
                cursor.set_position(*end, MoveMode::KeepAnchor);
                cursor.remove_selected_text();
            },
            Step::Split { at } => {
                let mut cursor = contributor.cursor(document);
                cursor.set_position(*at, MoveMode::Move);
                cursor.insert_block();
            },
            Step::Begin => contributor.begin_edit(document).map_err(document_error(line))?,
            Step::End => contributor.end_edit(document).map_err(document_error(line))?,
            Step::Undo => contributor.undo(document).map_err(document_error(line))?,
            Step::Redo => contributor.redo(document).map_err(document_error(line))?,
        }
    }
    contributor
        .release(document)
        .map_err(document_error(steps.last().map_or(0, |(line, _)| *line)))
}

pub fn run(file: &Path, script: &Path) -> Result<String> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let script_text = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;

    let steps = parse(&script_text)?;
    let mut document = TextDocument::from_text(&text);
    apply(&mut document, &steps)?;
    tracing::info!(
        "replayed {} steps, {} undo entries left",
        steps.len(),
        document.undo_stack().len()
    );
    Ok(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        let script = "# demo\ninsert 0:6 World\\n!\n\ndelete 0:0 0:5\nsplit 1:0\nbegin\nend\nundo\nredo\n";
        let steps: Vec<Step> = parse(script).unwrap().into_iter().map(|(_, step)| step).collect();
        assert_eq!(
            steps,
            vec![
                Step::Insert {
                    at: Position::new(0, 6),
                    text: "World\n!".to_string()
                },
                Step::Delete {
                    begin: Position::new(0, 0),
                    end: Position::new(0, 5)
                },
                Step::Split { at: Position::new(1, 0) },
                Step::Begin,
                Step::End,
                Step::Undo,
                Step::Redo,
            ]
        );
    }

    #[test]
    fn insert_keeps_inner_spaces() {
        let steps = parse("insert 0:0 a  b ").unwrap();
        assert_eq!(
            steps[0].1,
            Step::Insert {
                at: Position::zero(),
                text: "a  b ".to_string()
            }
        );
    }

    #[test]
    fn reports_the_failing_line() {
        assert_eq!(
            parse("undo\nfrobnicate 1:1"),
            Err(ScriptError::UnknownCommand {
                line: 2,
                command: "frobnicate".to_string()
            })
        );
        assert!(matches!(
            parse("delete 0:0"),
            Err(ScriptError::MissingArgument { line: 1, .. })
        ));
        assert!(matches!(
            parse("split x:0"),
            Err(ScriptError::BadPosition { line: 1, .. })
        ));
    }

    #[test]
    fn replays_hello_world() {
        let mut document = TextDocument::from_text("Hello !");
        let steps = parse("insert 0:6 World\nundo\nredo").unwrap();
        apply(&mut document, &steps).unwrap();
        assert_eq!(document.to_string(), "Hello World!");
        assert_eq!(document.cursor_count(), 0);
    }

    #[test]
    fn transaction_undoes_in_one_step() {
        let mut document = TextDocument::from_text("one two");
        let steps = parse("begin\ndelete 0:0 0:4\ninsert 0:3 s\nsplit 0:4\nend\nundo").unwrap();
        apply(&mut document, &steps).unwrap();
        assert_eq!(document.to_string(), "one two");
    }

    #[test]
    fn undo_with_empty_history_fails() {
        let mut document = TextDocument::from_text("x");
        let steps = parse("\n\nundo").unwrap();
        assert_eq!(
            apply(&mut document, &steps),
            Err(ScriptError::Document {
                line: 3,
                source: TextError::NothingToUndo
            })
        );
    }

    #[test]
    fn runs_from_files() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = tmp_dir.path().join("doc.txt");
        let script = tmp_dir.path().join("edits.tome");
        std::fs::write(&file, "alpha\nbeta").unwrap();
        std::fs::write(&script, "delete 0:5 1:0\ninsert 0:5 \\t").unwrap();
        assert_eq!(run(&file, &script).unwrap(), "alpha\tbeta");
    }
}

//! Test helpers to reduce boilerplate in tests

use crate::Composer;
use tome_text::TextDocument;

/// Every visual line rendered as plain text
pub fn render(composer: &Composer, document: &TextDocument) -> Vec<String> {
    (0..composer.height())
        .filter_map(|index| composer.render_line(document, index))
        .collect()
}

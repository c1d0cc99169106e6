//! A composer wired to a document.
//!
//! [`TextView`] owns a [`Composer`] behind `Rc<RefCell<_>>` and registers it
//! with the document, so every edit relays out the affected lines before the
//! edit call returns.

use crate::{
    composer::Composer,
    config::LayoutConfig,
    error::Result,
    line::{FoldId, InsertId},
};
use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};
use tome_text::{DocumentListener, Position, TextDocument};

pub struct TextView {
    composer: Rc<RefCell<Composer>>,
}

impl TextView {
    pub fn new(document: &mut TextDocument, config: LayoutConfig) -> Self {
        let composer = Rc::new(RefCell::new(Composer::new(document, config)));
        let listener: Rc<RefCell<dyn DocumentListener>> = composer.clone();
        document.add_listener(Rc::downgrade(&listener));
        tracing::debug!("view attached to {:?}", document.id());
        Self { composer }
    }

    /// Read access to the layout.
    ///
    /// Do not hold the guard across an edit to the document: the composer is
    /// busy while borrowed and would miss the notification (a panic in debug
    /// builds).
    pub fn composer(&self) -> Ref<'_, Composer> {
        self.composer.borrow()
    }

    pub fn height(&self) -> usize {
        self.composer.borrow().height()
    }

    pub fn render_line(&self, document: &TextDocument, index: usize) -> Option<String> {
        self.composer.borrow().render_line(document, index)
    }

    pub fn set_config(&self, document: &TextDocument, config: LayoutConfig) {
        self.composer.borrow_mut().set_config(document, config);
    }

    pub fn add_fold(
        &self,
        document: &mut TextDocument,
        begin: Position,
        end: Position,
    ) -> Result<FoldId> {
        self.composer.borrow_mut().add_fold(document, begin, end)
    }

    pub fn remove_fold(&self, document: &mut TextDocument, id: FoldId) -> Result<()> {
        self.composer.borrow_mut().remove_fold(document, id)
    }

    pub fn add_insert(
        &self,
        document: &mut TextDocument,
        position: Position,
        width: usize,
        payload: u64,
    ) -> Result<InsertId> {
        self.composer
            .borrow_mut()
            .add_insert(document, position, width, payload)
    }

    pub fn add_inline_insert(
        &self,
        document: &mut TextDocument,
        position: Position,
        width: usize,
        payload: u64,
    ) -> Result<InsertId> {
        self.composer
            .borrow_mut()
            .add_inline_insert(document, position, width, payload)
    }

    pub fn remove_insert(&self, document: &mut TextDocument, id: InsertId) -> Result<u64> {
        self.composer.borrow_mut().remove_insert(document, id)
    }

    /// Stop listening to `document` and release every anchor placed in it.
    pub fn detach(self, document: &mut TextDocument) -> Result<()> {
        let listener: Rc<RefCell<dyn DocumentListener>> = self.composer.clone();
        document.remove_listener(&listener);
        self.composer.borrow_mut().release(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WrapMode;

    #[test]
    fn view_follows_edits() {
        let mut document = TextDocument::from_text("alpha beta");
        let config = LayoutConfig {
            wrap_mode: WrapMode::Word,
            characters_per_line: 6,
            ..LayoutConfig::default()
        };
        let view = TextView::new(&mut document, config);
        assert_eq!(view.height(), 2);

        document.insert_text(Position::new(0, 10), " gamma");
        assert_eq!(view.height(), 3);
        assert_eq!(view.render_line(&document, 2).as_deref(), Some("gamma"));

        document.undo(tome_text::AuthorId::DEFAULT).unwrap();
        assert_eq!(view.height(), 2);

        view.detach(&mut document).unwrap();
        document.insert_text(Position::new(0, 0), "\n\n");
        assert_eq!(document.cursor_count(), 0);
    }

    #[test]
    fn fold_through_view_survives_edits() {
        let mut document = TextDocument::from_text("fn a() {\n    body\n}\nfn b() {}");
        let view = TextView::new(&mut document, LayoutConfig::default());
        let fold = view
            .add_fold(&mut document, Position::new(0, 8), Position::new(2, 0))
            .unwrap();
        assert_eq!(view.height(), 2);
        assert_eq!(view.render_line(&document, 0).as_deref(), Some("fn a() {...}"));

        // Typing inside the folded body keeps it folded.
        document.insert_text(Position::new(1, 8), "();");
        assert_eq!(view.height(), 2);
        assert_eq!(
            view.composer().fold_range(&document, fold).unwrap().end,
            Position::new(2, 0)
        );

        // A new line above the fold shifts it down.
        document.insert_text(Position::new(0, 0), "// doc\n");
        assert_eq!(view.height(), 3);
        assert_eq!(view.render_line(&document, 1).as_deref(), Some("fn a() {...}"));

        view.remove_fold(&mut document, fold).unwrap();
        assert_eq!(view.height(), 5);
        view.detach(&mut document).unwrap();
    }
}

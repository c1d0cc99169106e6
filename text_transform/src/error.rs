use crate::line::{FoldId, InsertId};
use snafu::Snafu;
use tome_text::TextError;

/// Errors from fold and insert management on a [`crate::Composer`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ComposerError {
    #[snafu(display("Fold {id:?} does not exist"))]
    UnknownFold { id: FoldId },

    #[snafu(display("Insert {id:?} does not exist"))]
    UnknownInsert { id: InsertId },

    #[snafu(display("Document rejected an anchor operation"))]
    Text { source: TextError },
}

pub type Result<T, E = ComposerError> = std::result::Result<T, E>;

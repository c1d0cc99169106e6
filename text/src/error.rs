use crate::{contributor::AuthorId, cursor::CursorId};
use snafu::Snafu;

/// Errors from transaction, history and cursor operations on a document.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum TextError {
    #[snafu(display("Transaction already open by {owner}, {requested} cannot begin one"))]
    AlreadyActive {
        owner: AuthorId,
        requested: AuthorId,
    },

    #[snafu(display("No transaction is open"))]
    NoActiveTransaction,

    #[snafu(display("Transaction is owned by {owner}, not {requested}"))]
    NotTransactionOwner {
        owner: AuthorId,
        requested: AuthorId,
    },

    #[snafu(display("Cannot undo or redo while a transaction is open"))]
    TransactionInProgress,

    #[snafu(display("Nothing to undo"))]
    NothingToUndo,

    #[snafu(display("Nothing to redo"))]
    NothingToRedo,

    #[snafu(display("Last change was made by {owner}, not {requested}"))]
    ForeignContribution {
        owner: AuthorId,
        requested: AuthorId,
    },

    #[snafu(display("Cursor {id:?} is not registered with this document"))]
    UnknownCursor { id: CursorId },
}

pub type Result<T, E = TextError> = std::result::Result<T, E>;

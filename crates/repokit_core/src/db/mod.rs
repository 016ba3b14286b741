//! SQLite storage bootstrap and the SQLite context backend.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Host entity sets as JSON-bodied tables behind [`ContextBackend`].
//!
//! # Invariants
//! - Set names are validated before they are interpolated into SQL.
//! - One commit batch maps to one SQLite transaction.
//!
//! [`ContextBackend`]: crate::context::ContextBackend

use thiserror::Error;

mod open;
mod sqlite_backend;

pub use open::{open_db, open_db_in_memory};
pub use sqlite_backend::SqliteBackend;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid entity set name `{0}`")]
    InvalidSetName(String),

    #[error("row {id} in `{set}` is not valid JSON: {message}")]
    CorruptRow {
        set: String,
        id: i64,
        message: String,
    },
}

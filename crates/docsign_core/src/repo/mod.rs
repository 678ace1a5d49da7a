//! Repository layer abstractions and SQLite persistence.
//!
//! # Responsibility
//! - Define the transactional store contract used by services.
//! - Isolate SQLite query details from lifecycle orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateToken`)
//!   in addition to DB transport errors.
//! - Uniqueness is decided by storage constraints, never check-then-insert.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod document_repo;
pub mod signature_repo;
pub mod store;

use crate::db::DbError;
use rusqlite::ffi;

pub use store::{SigningStore, SqliteSigningStore, StoreScope};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for documents, share links and signatures.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("share token already exists")]
    DuplicateToken,
    #[error("content locator already exists: {0}")]
    DuplicateLocator(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("required table is missing: {0}")]
    MissingRequiredTable(&'static str),
    #[error("required column is missing: {table}.{column}")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

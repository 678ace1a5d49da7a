//! Transactional store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Give services a storage-agnostic unit of work (`StoreScope`).
//! - Run every multi-record mutation inside one durable transaction.
//!
//! # Invariants
//! - `write` scopes run under `BEGIN IMMEDIATE`: competing writers serialize
//!   on the database lock, so state read inside a scope is still current
//!   when the scope writes.
//! - A scope commits only when its closure returns `Ok`; any `Err` rolls back
//!   every write made in that scope.

use super::{document_repo, signature_repo, RepoError, RepoResult};
use crate::model::document::{Document, DocumentId};
use crate::model::share_link::{ShareLink, ShareToken};
use crate::model::signature::{Signature, SignatureId};
use crate::model::UserId;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Record-level operations available inside a store scope.
pub trait StoreScope {
    fn load_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    /// Loads the document carrying a share link with `token`.
    fn load_document_by_token(&self, token: &ShareToken) -> RepoResult<Option<Document>>;
    fn list_documents_by_owner(&self, owner: UserId) -> RepoResult<Vec<Document>>;
    fn list_document_ids(&self) -> RepoResult<Vec<DocumentId>>;
    /// Inserts a document and any share links it already carries.
    fn insert_document(&self, document: &Document) -> RepoResult<()>;
    fn set_document_finalized(&self, id: DocumentId, now_ms: i64) -> RepoResult<()>;
    /// Fails with `RepoError::DuplicateToken` when the token exists anywhere.
    fn insert_share_link(&self, document_id: DocumentId, link: &ShareLink) -> RepoResult<()>;
    fn update_share_link(&self, document_id: DocumentId, link: &ShareLink) -> RepoResult<()>;
    fn load_signature(&self, id: SignatureId) -> RepoResult<Option<Signature>>;
    fn list_signatures(&self, document_id: DocumentId) -> RepoResult<Vec<Signature>>;
    fn insert_signature(&self, signature: &Signature) -> RepoResult<()>;
    fn update_signature(&self, signature: &Signature) -> RepoResult<()>;
}

/// Unit-of-work entry point used by services.
pub trait SigningStore {
    /// Runs `f` against a consistent read snapshot.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreScope) -> Result<T, E>,
        E: From<RepoError>;

    /// Runs `f` in a write transaction; commits on `Ok`, rolls back on `Err`.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreScope) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed signing store borrowing a migrated connection.
#[derive(Clone, Copy)]
pub struct SqliteSigningStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSigningStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SigningStore for SqliteSigningStore<'_> {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreScope) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.run(TransactionBehavior::Deferred, f)
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreScope) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.run(TransactionBehavior::Immediate, f)
    }
}

impl SqliteSigningStore<'_> {
    fn run<T, E, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreScope) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, behavior).map_err(RepoError::from)?;
        let value = f(&SqliteScope { conn: &tx })?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

struct SqliteScope<'a> {
    conn: &'a Connection,
}

impl StoreScope for SqliteScope<'_> {
    fn load_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        document_repo::load_document(self.conn, id)
    }

    fn load_document_by_token(&self, token: &ShareToken) -> RepoResult<Option<Document>> {
        document_repo::load_document_by_token(self.conn, token)
    }

    fn list_documents_by_owner(&self, owner: UserId) -> RepoResult<Vec<Document>> {
        document_repo::list_documents_by_owner(self.conn, owner)
    }

    fn list_document_ids(&self) -> RepoResult<Vec<DocumentId>> {
        document_repo::list_document_ids(self.conn)
    }

    fn insert_document(&self, document: &Document) -> RepoResult<()> {
        document_repo::insert_document(self.conn, document)
    }

    fn set_document_finalized(&self, id: DocumentId, now_ms: i64) -> RepoResult<()> {
        document_repo::set_document_finalized(self.conn, id, now_ms)
    }

    fn insert_share_link(&self, document_id: DocumentId, link: &ShareLink) -> RepoResult<()> {
        document_repo::insert_share_link(self.conn, document_id, link)
    }

    fn update_share_link(&self, document_id: DocumentId, link: &ShareLink) -> RepoResult<()> {
        document_repo::update_share_link(self.conn, document_id, link)
    }

    fn load_signature(&self, id: SignatureId) -> RepoResult<Option<Signature>> {
        signature_repo::load_signature(self.conn, id)
    }

    fn list_signatures(&self, document_id: DocumentId) -> RepoResult<Vec<Signature>> {
        signature_repo::list_signatures(self.conn, document_id)
    }

    fn insert_signature(&self, signature: &Signature) -> RepoResult<()> {
        signature_repo::insert_signature(self.conn, signature)
    }

    fn update_signature(&self, signature: &Signature) -> RepoResult<()> {
        signature_repo::update_signature(self.conn, signature)
    }
}

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "documents",
        &["id", "owner_id", "content_locator", "finalized"],
    ),
    (
        "share_links",
        &["token", "document_id", "status", "expires_at"],
    ),
    (
        "signatures",
        &["id", "document_id", "status", "share_token"],
    ),
];

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

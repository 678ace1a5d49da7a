//! Document and share-link SQL.
//!
//! # Responsibility
//! - Persist documents and their embedded share links.
//! - Load a document together with its links in creation order.
//!
//! # Invariants
//! - Share links are inserted with a plain `INSERT`; a token collision
//!   surfaces as `RepoError::DuplicateToken` and never overwrites a row.
//! - Link updates are scoped to `(token, document_id)`.

use super::{bool_to_int, is_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::model::document::{Document, DocumentId};
use crate::model::lifecycle::LinkStatus;
use crate::model::share_link::{ShareLink, ShareToken};
use crate::model::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    original_name,
    content_locator,
    mime_type,
    size_bytes,
    finalized,
    created_at,
    updated_at
FROM documents";

const LINK_SELECT_SQL: &str = "SELECT
    token,
    recipient_email,
    expires_at,
    status,
    signed_by,
    signed_at,
    created_at
FROM share_links";

pub(crate) fn insert_document(conn: &Connection, document: &Document) -> RepoResult<()> {
    let size = size_to_db(document.size_bytes)?;
    let result = conn.execute(
        "INSERT INTO documents (
            id,
            owner_id,
            original_name,
            content_locator,
            mime_type,
            size_bytes,
            finalized,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            document.id.to_string(),
            document.owner.to_string(),
            document.original_name.as_str(),
            document.content_locator.as_str(),
            document.mime_type.as_str(),
            size,
            bool_to_int(document.finalized),
            document.created_at,
            document.updated_at,
        ],
    );

    match result {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            return Err(RepoError::DuplicateLocator(
                document.content_locator.clone(),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    for link in &document.share_links {
        insert_share_link(conn, document.id, link)?;
    }
    Ok(())
}

pub(crate) fn load_document(conn: &Connection, id: DocumentId) -> RepoResult<Option<Document>> {
    let mut stmt = conn.prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut document = parse_document_row(row)?;
    document.share_links = load_share_links(conn, document.id)?;
    Ok(Some(document))
}

pub(crate) fn load_document_by_token(
    conn: &Connection,
    token: &ShareToken,
) -> RepoResult<Option<Document>> {
    let document_id: Option<String> = conn
        .query_row(
            "SELECT document_id FROM share_links WHERE token = ?1;",
            [token.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match document_id {
        Some(value) => load_document(conn, parse_uuid(&value, "share_links.document_id")?),
        None => Ok(None),
    }
}

pub(crate) fn list_documents_by_owner(
    conn: &Connection,
    owner: UserId,
) -> RepoResult<Vec<Document>> {
    let mut stmt = conn.prepare(&format!(
        "{DOCUMENT_SELECT_SQL}
         WHERE owner_id = ?1
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        documents.push(parse_document_row(row)?);
    }

    for document in &mut documents {
        document.share_links = load_share_links(conn, document.id)?;
    }
    Ok(documents)
}

pub(crate) fn list_document_ids(conn: &Connection) -> RepoResult<Vec<DocumentId>> {
    let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY created_at ASC, rowid ASC;")?;
    let mut rows = stmt.query([])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "documents.id")?);
    }
    Ok(ids)
}

pub(crate) fn set_document_finalized(
    conn: &Connection,
    id: DocumentId,
    now_ms: i64,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE documents
         SET
            finalized = 1,
            updated_at = ?2
         WHERE id = ?1;",
        params![id.to_string(), now_ms],
    )?;

    if changed == 0 {
        return Err(not_found_document(id));
    }
    Ok(())
}

pub(crate) fn insert_share_link(
    conn: &Connection,
    document_id: DocumentId,
    link: &ShareLink,
) -> RepoResult<()> {
    let result = conn.execute(
        "INSERT INTO share_links (
            token,
            document_id,
            recipient_email,
            expires_at,
            status,
            signed_by,
            signed_at,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            link.token.as_str(),
            document_id.to_string(),
            link.recipient_email.as_str(),
            link.expires_at,
            link.status.as_str(),
            link.signed_by.as_deref(),
            link.signed_at,
            link.created_at,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateToken),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn update_share_link(
    conn: &Connection,
    document_id: DocumentId,
    link: &ShareLink,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE share_links
         SET
            status = ?3,
            signed_by = ?4,
            signed_at = ?5
         WHERE token = ?1
           AND document_id = ?2;",
        params![
            link.token.as_str(),
            document_id.to_string(),
            link.status.as_str(),
            link.signed_by.as_deref(),
            link.signed_at,
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "share link",
            id: link.token.redacted(),
        });
    }
    Ok(())
}

fn load_share_links(conn: &Connection, document_id: DocumentId) -> RepoResult<Vec<ShareLink>> {
    let mut stmt = conn.prepare(&format!(
        "{LINK_SELECT_SQL}
         WHERE document_id = ?1
         ORDER BY seq ASC;"
    ))?;
    let mut rows = stmt.query([document_id.to_string()])?;
    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        links.push(parse_link_row(row)?);
    }
    Ok(links)
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("owner_id")?;

    let size: i64 = row.get("size_bytes")?;
    let size_bytes = u64::try_from(size).map_err(|_| {
        RepoError::InvalidData(format!("invalid size `{size}` in documents.size_bytes"))
    })?;

    let finalized = match row.get::<_, i64>("finalized")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid finalized value `{other}` in documents.finalized"
            )));
        }
    };

    Ok(Document {
        id: parse_uuid(&id_text, "documents.id")?,
        owner: parse_uuid(&owner_text, "documents.owner_id")?,
        original_name: row.get("original_name")?,
        content_locator: row.get("content_locator")?,
        mime_type: row.get("mime_type")?,
        size_bytes,
        finalized,
        share_links: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_link_row(row: &Row<'_>) -> RepoResult<ShareLink> {
    let status_text: String = row.get("status")?;
    let status = LinkStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid link status `{status_text}` in share_links.status"
        ))
    })?;
    let token: String = row.get("token")?;

    Ok(ShareLink {
        token: ShareToken::new(token),
        recipient_email: row.get("recipient_email")?,
        expires_at: row.get("expires_at")?,
        status,
        signed_by: row.get("signed_by")?,
        signed_at: row.get("signed_at")?,
        created_at: row.get("created_at")?,
    })
}

fn size_to_db(size_bytes: u64) -> RepoResult<i64> {
    i64::try_from(size_bytes)
        .map_err(|_| RepoError::InvalidData(format!("document size {size_bytes} out of range")))
}

pub(crate) fn not_found_document(id: DocumentId) -> RepoError {
    RepoError::NotFound {
        entity: "document",
        id: id.to_string(),
    }
}

//! Signature SQL.
//!
//! # Invariants
//! - Write paths call `Signature::validate()` before SQL mutations.
//! - Listing is deterministic: creation time, then insertion order.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::document::DocumentId;
use crate::model::lifecycle::SignatureStatus;
use crate::model::share_link::ShareToken;
use crate::model::signature::{Placement, PlacementKind, RenderKind, Signature, SignatureId};
use rusqlite::{params, Connection, Row};

const SIGNATURE_SELECT_SQL: &str = "SELECT
    id,
    document_id,
    owner_id,
    x,
    y,
    page,
    placement_kind,
    render_kind,
    value,
    status,
    signer_email,
    signed_at,
    share_token,
    created_at,
    updated_at
FROM signatures";

pub(crate) fn insert_signature(conn: &Connection, signature: &Signature) -> RepoResult<()> {
    signature
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;

    conn.execute(
        "INSERT INTO signatures (
            id,
            document_id,
            owner_id,
            x,
            y,
            page,
            placement_kind,
            render_kind,
            value,
            status,
            signer_email,
            signed_at,
            share_token,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
        params![
            signature.id.to_string(),
            signature.document_id.to_string(),
            signature.owner.to_string(),
            signature.placement.x,
            signature.placement.y,
            signature.placement.page,
            signature.kind.as_str(),
            signature.render.as_str(),
            signature.value.as_str(),
            signature.status.as_str(),
            signature.signer_email.as_deref(),
            signature.signed_at,
            signature.share_token.as_ref().map(ShareToken::as_str),
            signature.created_at,
            signature.updated_at,
        ],
    )?;
    Ok(())
}

/// Persists the mutable part of a signature: status, value and signing data.
pub(crate) fn update_signature(conn: &Connection, signature: &Signature) -> RepoResult<()> {
    signature
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;

    let changed = conn.execute(
        "UPDATE signatures
         SET
            value = ?2,
            status = ?3,
            signer_email = ?4,
            signed_at = ?5,
            share_token = ?6,
            updated_at = ?7
         WHERE id = ?1;",
        params![
            signature.id.to_string(),
            signature.value.as_str(),
            signature.status.as_str(),
            signature.signer_email.as_deref(),
            signature.signed_at,
            signature.share_token.as_ref().map(ShareToken::as_str),
            signature.updated_at,
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "signature",
            id: signature.id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn load_signature(conn: &Connection, id: SignatureId) -> RepoResult<Option<Signature>> {
    let mut stmt = conn.prepare(&format!("{SIGNATURE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_signature_row(row)?));
    }
    Ok(None)
}

pub(crate) fn list_signatures(
    conn: &Connection,
    document_id: DocumentId,
) -> RepoResult<Vec<Signature>> {
    let mut stmt = conn.prepare(&format!(
        "{SIGNATURE_SELECT_SQL}
         WHERE document_id = ?1
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([document_id.to_string()])?;
    let mut signatures = Vec::new();
    while let Some(row) = rows.next()? {
        signatures.push(parse_signature_row(row)?);
    }
    Ok(signatures)
}

fn parse_signature_row(row: &Row<'_>) -> RepoResult<Signature> {
    let id_text: String = row.get("id")?;
    let document_text: String = row.get("document_id")?;
    let owner_text: String = row.get("owner_id")?;

    let kind_text: String = row.get("placement_kind")?;
    let kind = PlacementKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid placement kind `{kind_text}` in signatures.placement_kind"
        ))
    })?;

    let render_text: String = row.get("render_kind")?;
    let render = RenderKind::parse(&render_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid render kind `{render_text}` in signatures.render_kind"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = SignatureStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid signature status `{status_text}` in signatures.status"
        ))
    })?;

    let signature = Signature {
        id: parse_uuid(&id_text, "signatures.id")?,
        document_id: parse_uuid(&document_text, "signatures.document_id")?,
        owner: parse_uuid(&owner_text, "signatures.owner_id")?,
        placement: Placement::new(row.get("x")?, row.get("y")?, row.get("page")?),
        kind,
        render,
        value: row.get("value")?,
        status,
        signer_email: row.get("signer_email")?,
        signed_at: row.get("signed_at")?,
        share_token: row
            .get::<_, Option<String>>("share_token")?
            .map(ShareToken::new),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    signature
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(signature)
}

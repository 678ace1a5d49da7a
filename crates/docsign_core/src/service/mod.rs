//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store scopes into use-case level APIs.
//! - Enforce ownership, finalization and link-lifecycle rules before writes.
//!
//! # Invariants
//! - Every mutation runs inside exactly one `SigningStore::write` scope.
//! - A scope that yields `Ok(Err(e))` commits its writes and still reports
//!   `e`; expiry uses this to persist `declined` while failing the call.

pub mod document_service;
pub mod lifecycle_service;
pub mod share_link_service;
pub mod signature_service;

use crate::error::{ServiceError, ServiceResult};
use crate::model::document::{Document, DocumentId};
use crate::model::principal::Principal;
use crate::repo::StoreScope;
use log::warn;

/// Outer error rolls the scope back; inner error is reported after commit.
pub(crate) type ScopeResult<T> = ServiceResult<ServiceResult<T>>;

pub(crate) fn committed<T>(result: ScopeResult<T>) -> ServiceResult<T> {
    result.and_then(|inner| inner)
}

/// Loads a document and checks that `principal` owns it.
pub(crate) fn load_owned_document(
    scope: &dyn StoreScope,
    id: DocumentId,
    principal: &Principal,
) -> ServiceResult<Document> {
    let document = scope
        .load_document(id)?
        .ok_or_else(|| ServiceError::not_found("document", id))?;

    if !document.is_owned_by(principal.user_id) {
        warn!(
            "event=ownership_check module=service status=error document_id={} user_id={}",
            id, principal.user_id
        );
        return Err(ServiceError::Unauthorized(format!(
            "caller does not own document {id}"
        )));
    }
    Ok(document)
}

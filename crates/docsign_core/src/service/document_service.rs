//! Document use-case service.
//!
//! # Responsibility
//! - Accept owner uploads and record their content locator.
//! - Serve owner-scoped reads.
//! - Act as the finalization gate.
//!
//! # Invariants
//! - `finalized` only moves false -> true; a repeat call is rejected with
//!   `AlreadyFinalized`.

use super::load_owned_document;
use crate::clock::Clock;
use crate::content::{ContentStore, Upload};
use crate::error::{ServiceError, ServiceResult};
use crate::model::document::{validate_upload, Document, DocumentId, PDF_MIME_TYPE};
use crate::model::principal::Principal;
use crate::repo::SigningStore;
use log::info;
use std::sync::Arc;

/// Document service facade over a signing store.
pub struct DocumentService<S: SigningStore> {
    store: S,
    content: Arc<dyn ContentStore>,
    clock: Arc<dyn Clock>,
    max_upload_bytes: u64,
}

impl<S: SigningStore> DocumentService<S> {
    pub fn new(
        store: S,
        content: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            content,
            clock,
            max_upload_bytes,
        }
    }

    /// Validates a PDF upload, stores its bytes and records the document.
    pub fn upload(&self, principal: &Principal, upload: &Upload) -> ServiceResult<Document> {
        let size_bytes = upload.bytes.len() as u64;
        validate_upload(
            &upload.original_name,
            &upload.mime_type,
            size_bytes,
            self.max_upload_bytes,
        )?;

        let locator = self.content.put(upload)?;
        let document = Document::new(
            principal.user_id,
            upload.original_name.trim(),
            locator,
            PDF_MIME_TYPE,
            size_bytes,
            self.clock.now_ms(),
        );

        self.store
            .write(|scope| -> ServiceResult<()> { Ok(scope.insert_document(&document)?) })?;

        info!(
            "event=document_upload module=service status=ok document_id={} size_bytes={}",
            document.id, document.size_bytes
        );
        Ok(document)
    }

    pub fn get(&self, principal: &Principal, id: DocumentId) -> ServiceResult<Document> {
        self.store
            .read(|scope| load_owned_document(scope, id, principal))
    }

    /// Lists the caller's documents in upload order.
    pub fn list_for_owner(&self, principal: &Principal) -> ServiceResult<Vec<Document>> {
        self.store.read(|scope| -> ServiceResult<Vec<Document>> {
            Ok(scope.list_documents_by_owner(principal.user_id)?)
        })
    }

    /// Freezes the document; later link, signature and status writes fail.
    pub fn finalize(&self, principal: &Principal, id: DocumentId) -> ServiceResult<Document> {
        let now = self.clock.now_ms();
        let document = self.store.write(|scope| -> ServiceResult<Document> {
            let mut document = load_owned_document(scope, id, principal)?;
            if document.finalized {
                return Err(ServiceError::AlreadyFinalized(id));
            }

            scope.set_document_finalized(id, now)?;
            document.finalized = true;
            document.updated_at = now;
            Ok(document)
        })?;

        info!(
            "event=document_finalize module=service status=ok document_id={} links={}",
            document.id,
            document.share_links.len()
        );
        Ok(document)
    }
}

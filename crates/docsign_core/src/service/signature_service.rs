//! Signature use-case service.
//!
//! # Responsibility
//! - Save owner placements and serve owner-scoped reads.
//! - Apply direct status updates and bearer-token value attachment.
//!
//! # Invariants
//! - No signature is created or mutated while its document is finalized.
//! - External value attachment is authorized only by a share token that
//!   resolves to an unexpired, non-terminal link on the signature's
//!   document; the signature id alone is never enough.

use super::lifecycle_service::{apply_signing_event, SigningEvent};
use super::{committed, load_owned_document};
use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::model::document::DocumentId;
use crate::model::lifecycle::{SignatureStatus, SigningOutcome};
use crate::model::principal::Principal;
use crate::model::share_link::ShareToken;
use crate::model::signature::{
    Placement, PlacementError, PlacementKind, RenderKind, Signature, SignatureId,
};
use crate::repo::SigningStore;
use log::info;
use std::sync::Arc;

/// Owner request to save one placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSignature {
    pub document_id: DocumentId,
    pub placement: Placement,
    pub kind: PlacementKind,
    pub render: RenderKind,
    pub value: String,
}

/// Signature service facade over a signing store.
pub struct SignatureService<S: SigningStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: SigningStore> SignatureService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a `pending` signature on an owned, non-finalized document.
    ///
    /// Ownership and finalization are checked before placement validation.
    pub fn place(&self, principal: &Principal, request: &PlaceSignature) -> ServiceResult<Signature> {
        let now = self.clock.now_ms();
        let signature = self.store.write(|scope| -> ServiceResult<Signature> {
            let document = load_owned_document(scope, request.document_id, principal)?;
            document.ensure_mutable()?;

            let signature = Signature::new(
                document.id,
                principal.user_id,
                request.placement,
                request.kind,
                request.render,
                request.value.clone(),
                now,
            );
            signature.validate()?;
            scope.insert_signature(&signature)?;
            Ok(signature)
        })?;

        info!(
            "event=signature_place module=service status=ok document_id={} signature_id={} page={}",
            signature.document_id, signature.id, signature.placement.page
        );
        Ok(signature)
    }

    /// Lists a document's signatures in creation order.
    pub fn find_for_document(
        &self,
        principal: &Principal,
        document_id: DocumentId,
    ) -> ServiceResult<Vec<Signature>> {
        self.store.read(|scope| -> ServiceResult<Vec<Signature>> {
            load_owned_document(scope, document_id, principal)?;
            Ok(scope.list_signatures(document_id)?)
        })
    }

    pub fn get(&self, principal: &Principal, id: SignatureId) -> ServiceResult<Signature> {
        self.store.read(|scope| -> ServiceResult<Signature> {
            let signature = scope
                .load_signature(id)?
                .ok_or_else(|| ServiceError::not_found("signature", id))?;
            load_owned_document(scope, signature.document_id, principal)?;
            Ok(signature)
        })
    }

    /// Moves a signature to `status`.
    ///
    /// Terminal statuses stamp `signed_at` and the signer. Share links are
    /// left alone; token-driven signing goes through `LifecycleService`.
    pub fn update_status(
        &self,
        id: SignatureId,
        status: SignatureStatus,
        signed_by: Option<String>,
    ) -> ServiceResult<Signature> {
        let now = self.clock.now_ms();
        let signature = self.store.write(|scope| -> ServiceResult<Signature> {
            let mut signature = scope
                .load_signature(id)?
                .ok_or_else(|| ServiceError::not_found("signature", id))?;
            let document = scope
                .load_document(signature.document_id)?
                .ok_or_else(|| ServiceError::not_found("document", signature.document_id))?;
            document.ensure_mutable()?;

            signature.status = signature.status.advance(status)?;
            if status.is_terminal() {
                signature.signed_at = Some(now);
                if signed_by.is_some() {
                    signature.signer_email = signed_by;
                }
            }
            signature.updated_at = now;
            scope.update_signature(&signature)?;
            Ok(signature)
        })?;

        info!(
            "event=signature_status module=service status=ok signature_id={} signature_status={}",
            signature.id,
            signature.status.as_str()
        );
        Ok(signature)
    }

    /// Stores the recipient's rendered value and signs through `token`.
    ///
    /// The link and the signature move to `signed` together.
    pub fn attach_external_value(
        &self,
        token: &ShareToken,
        id: SignatureId,
        value: &str,
    ) -> ServiceResult<Signature> {
        if value.trim().is_empty() {
            return Err(PlacementError::EmptyValue.into());
        }

        let now = self.clock.now_ms();
        let result = self.store.write(|scope| {
            apply_signing_event(
                scope,
                SigningEvent {
                    token,
                    signature_id: id,
                    outcome: SigningOutcome::Signed,
                    signed_by: None,
                    value: Some(value.to_string()),
                },
                now,
            )
        });
        let receipt = committed(result)?;

        info!(
            "event=signature_attach module=service status=ok document_id={} signature_id={} token={}",
            receipt.document_id,
            receipt.signature.id,
            token.redacted()
        );
        Ok(receipt.signature)
    }
}

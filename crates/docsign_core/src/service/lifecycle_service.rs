//! Signing lifecycle engine.
//!
//! # Responsibility
//! - Drive share-token signing and declining so the link and the signature
//!   change together.
//! - Detect and repair link/signature disagreement left by foreign writers.
//!
//! # Invariants
//! - The paired link + signature update is one store write scope: both rows
//!   commit or neither does.
//! - Competing signers serialize on the write lock; the loser re-reads a
//!   terminal link and fails with `InvalidTransition`.
//! - An expired link is persisted as `declined` and the call fails with
//!   `InvalidOrExpiredLink`.
//! - Finalized documents are never repaired, only reported.

use super::{committed, ScopeResult};
use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::model::document::{Document, DocumentId};
use crate::model::lifecycle::{LinkEvent, LinkStatus, SignatureStatus, SigningOutcome};
use crate::model::share_link::{ShareLink, ShareToken};
use crate::model::signature::{Signature, SignatureId};
use crate::repo::{SigningStore, StoreScope};
use log::{info, warn};
use std::sync::Arc;

/// Anonymous recipient's request to sign one signature entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareSignRequest {
    pub token: ShareToken,
    pub signature_id: SignatureId,
    pub signed_by: String,
    /// Rendered signature content; keeps the placed value when `None`.
    pub value: Option<String>,
}

/// Both records as committed by one signing event.
#[derive(Debug, Clone, PartialEq)]
pub struct SigningReceipt {
    pub document_id: DocumentId,
    pub link: ShareLink,
    pub signature: Signature,
}

/// One signing event applied through a share token.
pub(crate) struct SigningEvent<'a> {
    pub token: &'a ShareToken,
    pub signature_id: SignatureId,
    pub outcome: SigningOutcome,
    /// Defaults to the link's recipient.
    pub signed_by: Option<String>,
    pub value: Option<String>,
}

/// Link/signature disagreement found by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileFinding {
    /// Link is terminal, token-bound signature still pending.
    SignatureBehindLink {
        signature_id: SignatureId,
        link_status: LinkStatus,
    },
    /// Signature is terminal, its link is not.
    LinkBehindSignature {
        signature_id: SignatureId,
        signature_status: SignatureStatus,
    },
    /// Both terminal with different outcomes; needs an operator.
    ConflictingOutcomes {
        signature_id: SignatureId,
        link_status: LinkStatus,
        signature_status: SignatureStatus,
    },
    /// Signature references a token the document does not carry.
    MissingLink { signature_id: SignatureId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub document_id: DocumentId,
    pub findings: Vec<ReconcileFinding>,
    /// Findings fixed in this pass.
    pub repaired: usize,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Lifecycle service facade over a signing store.
pub struct LifecycleService<S: SigningStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: SigningStore> LifecycleService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Signs `signature_id` on behalf of the token holder.
    ///
    /// # Errors
    /// - `Validation` for an empty signer or value.
    /// - `InvalidOrExpiredLink` for unknown or expired tokens.
    /// - `InvalidTransition` when the link or signature is already terminal.
    /// - `DocumentMismatch` when the signature belongs to another document.
    /// - `DocumentFinalized` after finalization.
    pub fn sign_via_share_token(&self, request: &ShareSignRequest) -> ServiceResult<SigningReceipt> {
        let signed_by = request.signed_by.trim();
        if signed_by.is_empty() {
            return Err(ServiceError::Validation("signed_by is required".to_string()));
        }
        let value = match request.value.as_deref() {
            Some(value) if value.trim().is_empty() => {
                return Err(ServiceError::Validation(
                    "signature value cannot be empty".to_string(),
                ));
            }
            other => other.map(str::to_string),
        };

        self.run_event(SigningEvent {
            token: &request.token,
            signature_id: request.signature_id,
            outcome: SigningOutcome::Signed,
            signed_by: Some(signed_by.to_string()),
            value,
        })
    }

    /// Declines `signature_id` on behalf of the token holder.
    pub fn decline_via_share_token(
        &self,
        token: &ShareToken,
        signature_id: SignatureId,
    ) -> ServiceResult<SigningReceipt> {
        self.run_event(SigningEvent {
            token,
            signature_id,
            outcome: SigningOutcome::Declined,
            signed_by: None,
            value: None,
        })
    }

    /// Checks every token-bound signature of one document against its link.
    ///
    /// Repairs copy the terminal side onto the lagging side. Conflicts and
    /// missing links are reported only.
    pub fn reconcile_document(&self, document_id: DocumentId) -> ServiceResult<ReconcileReport> {
        let now = self.clock.now_ms();
        let report = self.store.write(|scope| -> ServiceResult<ReconcileReport> {
            let mut document = scope
                .load_document(document_id)?
                .ok_or_else(|| ServiceError::not_found("document", document_id))?;
            let signatures = scope.list_signatures(document_id)?;
            reconcile_in_scope(scope, &mut document, signatures, now)
        })?;

        if report.is_consistent() {
            info!(
                "event=reconcile module=service status=ok document_id={}",
                document_id
            );
        } else {
            warn!(
                "event=reconcile module=service status=repaired document_id={} findings={} repaired={}",
                document_id,
                report.findings.len(),
                report.repaired
            );
        }
        Ok(report)
    }

    /// Reconciles every document; returns only reports with findings.
    pub fn reconcile_all(&self) -> ServiceResult<Vec<ReconcileReport>> {
        let ids = self.store.read(|scope| -> ServiceResult<Vec<DocumentId>> {
            Ok(scope.list_document_ids()?)
        })?;

        let mut reports = Vec::new();
        for id in ids {
            let report = self.reconcile_document(id)?;
            if !report.is_consistent() {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    fn run_event(&self, event: SigningEvent<'_>) -> ServiceResult<SigningReceipt> {
        let now = self.clock.now_ms();
        let token = event.token;
        let outcome = event.outcome;
        let result = self
            .store
            .write(|scope| apply_signing_event(scope, event, now));

        match committed(result) {
            Ok(receipt) => {
                info!(
                    "event=share_signing module=service status=ok document_id={} signature_id={} token={} outcome={}",
                    receipt.document_id,
                    receipt.signature.id,
                    token.redacted(),
                    receipt.link.status.as_str()
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    "event=share_signing module=service status=error token={} attempted={} kind={}",
                    token.redacted(),
                    outcome.link_event().as_str(),
                    err.kind().as_str()
                );
                Err(err)
            }
        }
    }
}

/// Applies one signing event to a link and a signature in the same scope.
///
/// Expiry writes the link as `declined` and reports `InvalidOrExpiredLink`
/// through the inner result so the caller's scope still commits.
pub(crate) fn apply_signing_event(
    scope: &dyn StoreScope,
    event: SigningEvent<'_>,
    now: i64,
) -> ScopeResult<SigningReceipt> {
    let Some(mut document) = scope.load_document_by_token(event.token)? else {
        return Err(ServiceError::InvalidOrExpiredLink);
    };
    document.ensure_mutable()?;
    let document_id = document.id;
    let Some(link) = document.link_mut(event.token) else {
        return Err(ServiceError::InvalidOrExpiredLink);
    };

    link.status.on(event.outcome.link_event())?;
    if link.is_expired(now) {
        if link.apply(LinkEvent::Expire)? {
            scope.update_share_link(document_id, link)?;
        }
        return Ok(Err(ServiceError::InvalidOrExpiredLink));
    }

    let mut signature = scope
        .load_signature(event.signature_id)?
        .ok_or_else(|| ServiceError::not_found("signature", event.signature_id))?;
    if signature.document_id != document_id {
        return Err(ServiceError::DocumentMismatch {
            signature_id: signature.id,
            document_id,
        });
    }

    let signed_by = event
        .signed_by
        .unwrap_or_else(|| link.recipient_email.clone());
    signature.status = signature
        .status
        .advance(event.outcome.signature_status())?;
    signature.signer_email = Some(signed_by.clone());
    signature.signed_at = Some(now);
    signature.share_token = Some(event.token.clone());
    signature.updated_at = now;
    if let Some(value) = event.value {
        signature.value = value;
    }
    link.complete(event.outcome, Some(signed_by), now)?;

    scope.update_share_link(document_id, link)?;
    scope.update_signature(&signature)?;

    Ok(Ok(SigningReceipt {
        document_id,
        link: link.clone(),
        signature,
    }))
}

fn reconcile_in_scope(
    scope: &dyn StoreScope,
    document: &mut Document,
    signatures: Vec<Signature>,
    now: i64,
) -> ServiceResult<ReconcileReport> {
    let read_only = document.finalized;
    let mut report = ReconcileReport {
        document_id: document.id,
        findings: Vec::new(),
        repaired: 0,
    };

    for mut signature in signatures {
        let Some(token) = signature.share_token.clone() else {
            continue;
        };
        let Some(link) = document.link_mut(&token) else {
            report.findings.push(ReconcileFinding::MissingLink {
                signature_id: signature.id,
            });
            continue;
        };

        let link_outcome = SigningOutcome::from_link_status(link.status);
        let signature_outcome = signature.status.terminal_outcome();
        match (link_outcome, signature_outcome) {
            (None, None) => {}
            (Some(a), Some(b)) if a == b => {}
            (Some(_), Some(_)) => {
                report.findings.push(ReconcileFinding::ConflictingOutcomes {
                    signature_id: signature.id,
                    link_status: link.status,
                    signature_status: signature.status,
                });
            }
            (Some(outcome), None) => {
                report.findings.push(ReconcileFinding::SignatureBehindLink {
                    signature_id: signature.id,
                    link_status: link.status,
                });
                if read_only {
                    continue;
                }
                signature.status = signature.status.advance(outcome.signature_status())?;
                signature.signer_email = link.signed_by.clone().or(signature.signer_email);
                signature.signed_at = Some(link.signed_at.unwrap_or(now));
                signature.updated_at = now;
                scope.update_signature(&signature)?;
                report.repaired += 1;
            }
            (None, Some(outcome)) => {
                report.findings.push(ReconcileFinding::LinkBehindSignature {
                    signature_id: signature.id,
                    signature_status: signature.status,
                });
                if read_only {
                    continue;
                }
                let at_ms = signature.signed_at.unwrap_or(now);
                link.complete(outcome, signature.signer_email.clone(), at_ms)?;
                scope.update_share_link(report.document_id, link)?;
                report.repaired += 1;
            }
        }
    }

    Ok(report)
}

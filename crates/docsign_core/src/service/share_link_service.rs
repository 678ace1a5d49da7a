//! Share-link use-case service.
//!
//! # Responsibility
//! - Issue share links for owned, non-finalized documents and notify the
//!   recipient.
//! - Resolve tokens for anonymous recipients, applying view and expiry
//!   transitions.
//! - Move a single link to a terminal status.
//!
//! # Invariants
//! - Token uniqueness is enforced by storage; a collision is retried with a
//!   fresh token and never overwrites an existing link.
//! - Notification failure is reported after the link is committed and never
//!   rolls it back.
//! - Expiry persists `declined` (unless already terminal) and still fails the
//!   call with `Expired`.
//! - Tokens appear in logs only in redacted form.

use super::{committed, load_owned_document, ScopeResult};
use crate::clock::Clock;
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::model::document::{Document, DocumentId};
use crate::model::lifecycle::{LinkEvent, LinkStatus, SigningOutcome};
use crate::model::principal::Principal;
use crate::model::share_link::{normalize_recipient_email, ShareLink, ShareToken};
use crate::notify::{ShareLinkMessage, ShareNotifier};
use crate::repo::{RepoError, SigningStore};
use crate::token::issue_token;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Attempts made to insert a link before giving up on token generation.
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

type TokenIssuer = Arc<dyn Fn() -> ShareToken + Send + Sync>;

/// Owner request to share one document with one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLinkRequest {
    pub document_id: DocumentId,
    pub recipient_email: String,
    /// Epoch milliseconds; falls back to the configured default TTL.
    pub expires_at: Option<i64>,
}

/// Committed link plus the URL delivered to the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    pub document_id: DocumentId,
    pub link: ShareLink,
    pub share_url: String,
}

/// Document metadata exposed to a share-link holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedDocument {
    pub id: DocumentId,
    pub original_name: String,
    pub content_locator: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub finalized: bool,
}

/// Link state exposed to its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedLinkStatus {
    pub token: ShareToken,
    pub recipient_email: String,
    pub status: LinkStatus,
    pub expires_at: Option<i64>,
}

/// Result of a successful token resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedDocumentView {
    pub document: SharedDocument,
    pub link: SharedLinkStatus,
}

impl SharedDocumentView {
    fn new(document: &Document, link: &ShareLink) -> Self {
        Self {
            document: SharedDocument {
                id: document.id,
                original_name: document.original_name.clone(),
                content_locator: document.content_locator.clone(),
                mime_type: document.mime_type.clone(),
                size_bytes: document.size_bytes,
                finalized: document.finalized,
            },
            link: SharedLinkStatus {
                token: link.token.clone(),
                recipient_email: link.recipient_email.clone(),
                status: link.status,
                expires_at: link.expires_at,
            },
        }
    }
}

/// Share-link service facade over a signing store.
pub struct ShareLinkService<S: SigningStore> {
    store: S,
    notifier: Arc<dyn ShareNotifier>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    issuer: TokenIssuer,
}

impl<S: SigningStore> ShareLinkService<S> {
    pub fn new(
        store: S,
        notifier: Arc<dyn ShareNotifier>,
        clock: Arc<dyn Clock>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            config: config.clone(),
            issuer: Arc::new(issue_token),
        }
    }

    /// Replaces the token source. Used to exercise collision handling.
    pub fn with_token_issuer(
        mut self,
        issuer: impl Fn() -> ShareToken + Send + Sync + 'static,
    ) -> Self {
        self.issuer = Arc::new(issuer);
        self
    }

    /// Creates a `pending` link and notifies the recipient.
    ///
    /// # Errors
    /// - `Unauthorized` / `NotFound` / `DocumentFinalized` before any write.
    /// - `DeliveryFailure` after commit; it carries the token and URL.
    pub fn create_link(
        &self,
        principal: &Principal,
        request: &CreateLinkRequest,
    ) -> ServiceResult<CreatedLink> {
        let recipient = normalize_recipient_email(&request.recipient_email)?;
        let now = self.clock.now_ms();
        let expires_at = request.expires_at.or_else(|| {
            self.config
                .default_link_ttl_ms()
                .map(|ttl| now.saturating_add(ttl))
        });

        let (document, link) =
            self.insert_fresh_link(principal, request.document_id, &recipient, expires_at, now)?;
        let share_url = self.config.share_url(&link.token);

        let message = ShareLinkMessage {
            recipient,
            sender_name: principal.display_name.clone(),
            document_name: document.original_name.clone(),
            share_url: share_url.clone(),
        };
        if let Err(err) = self.notifier.send_share_link(&message) {
            warn!(
                "event=share_link_notify module=service status=error document_id={} token={}",
                document.id,
                link.token.redacted()
            );
            return Err(ServiceError::DeliveryFailure {
                token: link.token,
                share_url,
                reason: err.to_string(),
            });
        }

        info!(
            "event=share_link_create module=service status=ok document_id={} token={} expires={}",
            document.id,
            link.token.redacted(),
            link.expires_at.is_some()
        );
        Ok(CreatedLink {
            document_id: document.id,
            link,
            share_url,
        })
    }

    /// Resolves a token for its anonymous holder.
    ///
    /// The first resolution moves `pending` to `viewed`; later calls return
    /// the stored status unchanged. Finalized documents are served read-only.
    pub fn resolve_by_token(&self, token: &ShareToken) -> ServiceResult<SharedDocumentView> {
        let now = self.clock.now_ms();
        let result = self.store.write(|scope| -> ScopeResult<SharedDocumentView> {
            let mut document = scope
                .load_document_by_token(token)?
                .ok_or_else(|| ServiceError::not_found("share link", token.redacted()))?;
            let document_id = document.id;
            let read_only = document.finalized;
            let link = document
                .link_mut(token)
                .ok_or_else(|| ServiceError::not_found("share link", token.redacted()))?;

            if link.is_expired(now) {
                if !read_only && link.apply(LinkEvent::Expire)? {
                    scope.update_share_link(document_id, link)?;
                }
                return Ok(Err(ServiceError::Expired));
            }

            if !read_only && link.apply(LinkEvent::Open)? {
                scope.update_share_link(document_id, link)?;
            }
            let link = link.clone();
            Ok(Ok(SharedDocumentView::new(&document, &link)))
        });

        match committed(result) {
            Ok(view) => {
                info!(
                    "event=share_link_resolve module=service status=ok token={} link_status={}",
                    token.redacted(),
                    view.link.status.as_str()
                );
                Ok(view)
            }
            Err(err) => {
                warn!(
                    "event=share_link_resolve module=service status=error token={} kind={}",
                    token.redacted(),
                    err.kind().as_str()
                );
                Err(err)
            }
        }
    }

    /// Moves one link to the terminal status of `outcome`.
    ///
    /// Touches the link only; signing flows that also carry a signature go
    /// through `LifecycleService`.
    pub fn mark_terminal(
        &self,
        token: &ShareToken,
        outcome: SigningOutcome,
        signed_by: Option<String>,
    ) -> ServiceResult<ShareLink> {
        let now = self.clock.now_ms();
        let result = self.store.write(|scope| -> ScopeResult<ShareLink> {
            let mut document = scope
                .load_document_by_token(token)?
                .ok_or_else(|| ServiceError::not_found("share link", token.redacted()))?;
            document.ensure_mutable()?;
            let document_id = document.id;
            let link = document
                .link_mut(token)
                .ok_or_else(|| ServiceError::not_found("share link", token.redacted()))?;

            link.status.on(outcome.link_event())?;
            if link.is_expired(now) {
                if link.apply(LinkEvent::Expire)? {
                    scope.update_share_link(document_id, link)?;
                }
                return Ok(Err(ServiceError::Expired));
            }

            let signed_by = signed_by.or_else(|| Some(link.recipient_email.clone()));
            link.complete(outcome, signed_by, now)?;
            scope.update_share_link(document_id, link)?;
            Ok(Ok(link.clone()))
        });

        let link = committed(result)?;
        info!(
            "event=share_link_terminal module=service status=ok token={} link_status={}",
            token.redacted(),
            link.status.as_str()
        );
        Ok(link)
    }

    fn insert_fresh_link(
        &self,
        principal: &Principal,
        document_id: DocumentId,
        recipient: &str,
        expires_at: Option<i64>,
        now: i64,
    ) -> ServiceResult<(Document, ShareLink)> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let link = ShareLink::new((self.issuer)(), recipient, expires_at, now);
            let inserted = self.store.write(|scope| -> ServiceResult<Option<Document>> {
                let document = load_owned_document(scope, document_id, principal)?;
                document.ensure_mutable()?;
                match scope.insert_share_link(document.id, &link) {
                    Ok(()) => Ok(Some(document)),
                    Err(RepoError::DuplicateToken) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            })?;

            match inserted {
                Some(mut document) => {
                    document.share_links.push(link.clone());
                    return Ok((document, link));
                }
                None => warn!(
                    "event=share_token_collision module=service status=retry document_id={} attempt={}",
                    document_id, attempt
                ),
            }
        }

        Err(ServiceError::Storage(format!(
            "no unique share token after {MAX_TOKEN_ATTEMPTS} attempts"
        )))
    }
}

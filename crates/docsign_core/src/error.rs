//! Service error taxonomy.
//!
//! # Invariants
//! - Raw storage errors never leave the service layer: they are logged and
//!   reduced to `ServiceError::Storage`.
//! - Anonymous-flow failures share one public message so callers cannot tell
//!   a missing token from an expired one.

use crate::content::ContentError;
use crate::model::document::{DocumentId, FinalizedError, UploadError};
use crate::model::lifecycle::TransitionError;
use crate::model::share_link::{RecipientError, ShareToken};
use crate::model::signature::{PlacementError, SignatureId};
use crate::repo::RepoError;
use log::error;

pub type ServiceResult<T> = Result<T, ServiceError>;

const PUBLIC_LINK_MESSAGE: &str = "Invalid or expired share link.";

/// Stable error kind codes for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Expired,
    InvalidTransition,
    DocumentFinalized,
    AlreadyFinalized,
    DocumentMismatch,
    InvalidOrExpiredLink,
    Validation,
    DeliveryFailure,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("share link has expired")]
    Expired,
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("document {0} is finalized")]
    DocumentFinalized(DocumentId),
    #[error("document {0} is already finalized")]
    AlreadyFinalized(DocumentId),
    #[error("signature {signature_id} does not belong to document {document_id}")]
    DocumentMismatch {
        signature_id: SignatureId,
        document_id: DocumentId,
    },
    #[error("share link is invalid or expired")]
    InvalidOrExpiredLink,
    #[error("validation failed: {0}")]
    Validation(String),
    /// The link was persisted; only the notification failed.
    #[error("share link created but delivery failed: {reason}")]
    DeliveryFailure {
        token: ShareToken,
        share_url: String,
        reason: String,
    },
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Expired => ErrorKind::Expired,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::DocumentFinalized(_) => ErrorKind::DocumentFinalized,
            Self::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            Self::DocumentMismatch { .. } => ErrorKind::DocumentMismatch,
            Self::InvalidOrExpiredLink => ErrorKind::InvalidOrExpiredLink,
            Self::Validation(_) => ErrorKind::Validation,
            Self::DeliveryFailure { .. } => ErrorKind::DeliveryFailure,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message safe to return to an anonymous share-link holder.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound
            | ErrorKind::Expired
            | ErrorKind::Unauthorized
            | ErrorKind::InvalidOrExpiredLink => PUBLIC_LINK_MESSAGE.to_string(),
            ErrorKind::Storage => "Internal error.".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::InvalidTransition => "invalid_transition",
            Self::DocumentFinalized => "document_finalized",
            Self::AlreadyFinalized => "already_finalized",
            Self::DocumentMismatch => "document_mismatch",
            Self::InvalidOrExpiredLink => "invalid_or_expired_link",
            Self::Validation => "validation_error",
            Self::DeliveryFailure => "delivery_failure",
            Self::Storage => "storage_error",
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => {
                error!(
                    "event=storage_failure module=service status=error error={}",
                    other
                );
                Self::Storage(other.to_string())
            }
        }
    }
}

impl From<FinalizedError> for ServiceError {
    fn from(value: FinalizedError) -> Self {
        Self::DocumentFinalized(value.0)
    }
}

impl From<PlacementError> for ServiceError {
    fn from(value: PlacementError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<UploadError> for ServiceError {
    fn from(value: UploadError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<RecipientError> for ServiceError {
    fn from(value: RecipientError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<ContentError> for ServiceError {
    fn from(value: ContentError) -> Self {
        error!(
            "event=content_store_failure module=service status=error error={}",
            value
        );
        Self::Storage(value.to_string())
    }
}

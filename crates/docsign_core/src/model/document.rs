//! Document aggregate.
//!
//! # Responsibility
//! - Define the uploaded document and its embedded share links.
//! - Validate upload metadata before content is stored.
//!
//! # Invariants
//! - Exactly one owning user per document.
//! - `finalized` is monotonic: once `true`, nothing on the document changes.
//! - Share links keep creation order.

use super::share_link::{ShareLink, ShareToken};
use super::UserId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub type DocumentId = Uuid;

/// Only accepted content type.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Upload metadata rejected before storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("original file name is required")]
    EmptyName,
    #[error("only PDF uploads are accepted, got `{mime_type}` for `{file_name}`")]
    NotPdf { file_name: String, mime_type: String },
    #[error("uploaded file is empty")]
    Empty,
    #[error("uploaded file is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Mutation attempted on a finalized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("document {0} is finalized")]
pub struct FinalizedError(pub DocumentId);

/// Owner-uploaded document with its share links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner: UserId,
    pub original_name: String,
    /// Opaque locator returned by the content store.
    pub content_locator: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub finalized: bool,
    pub share_links: Vec<ShareLink>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    /// Creates a non-finalized document without share links.
    pub fn new(
        owner: UserId,
        original_name: impl Into<String>,
        content_locator: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            original_name: original_name.into(),
            content_locator: content_locator.into(),
            mime_type: mime_type.into(),
            size_bytes,
            finalized: false,
            share_links: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner == user_id
    }

    /// Fails once the document is finalized.
    pub fn ensure_mutable(&self) -> Result<(), FinalizedError> {
        if self.finalized {
            return Err(FinalizedError(self.id));
        }
        Ok(())
    }

    pub fn link(&self, token: &ShareToken) -> Option<&ShareLink> {
        self.share_links.iter().find(|link| &link.token == token)
    }

    pub fn link_mut(&mut self, token: &ShareToken) -> Option<&mut ShareLink> {
        self.share_links.iter_mut().find(|link| &link.token == token)
    }
}

/// Checks upload metadata: PDF mime type and extension, non-empty, bounded size.
pub fn validate_upload(
    original_name: &str,
    mime_type: &str,
    size_bytes: u64,
    max_bytes: u64,
) -> Result<(), UploadError> {
    let name = original_name.trim();
    if name.is_empty() {
        return Err(UploadError::EmptyName);
    }

    let has_pdf_extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE) || !has_pdf_extension {
        return Err(UploadError::NotPdf {
            file_name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
    }

    if size_bytes == 0 {
        return Err(UploadError::Empty);
    }
    if size_bytes > max_bytes {
        return Err(UploadError::TooLarge {
            size: size_bytes,
            max: max_bytes,
        });
    }
    Ok(())
}

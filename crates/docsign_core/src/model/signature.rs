//! Signature placement records.
//!
//! # Responsibility
//! - Define the standalone signature entity and its placement.
//! - Validate placement coordinates and rendered value.
//!
//! # Invariants
//! - `x >= 0`, `y >= 0`, `page >= 1`, coordinates are finite.
//! - A signature belongs to exactly one document for its whole lifetime.
//! - `share_token` is set only by the signing event that completed it through
//!   a share link.

use super::document::DocumentId;
use super::lifecycle::SignatureStatus;
use super::share_link::ShareToken;
use super::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SignatureId = Uuid;

/// Mark category placed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Signature,
    Initial,
}

/// How the rendered value should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Text,
    /// Data URL or other encoded raster.
    Image,
}

/// Page location of a mark, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// 1-based page number.
    pub page: u32,
}

/// Where a signature came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOrigin<'a> {
    /// Placed and still only touched by the owning user.
    Owner(UserId),
    /// Completed by an anonymous recipient holding this token.
    External(&'a ShareToken),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("placement {axis} must be >= 0, got {value}")]
    NegativeCoordinate { axis: &'static str, value: f64 },
    #[error("placement {axis} must be a finite number")]
    NonFiniteCoordinate { axis: &'static str },
    #[error("placement page must be >= 1, got {0}")]
    PageOutOfRange(u32),
    #[error("signature value is required")]
    EmptyValue,
}

/// Standalone signature entity referencing its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: SignatureId,
    pub document_id: DocumentId,
    /// User who placed the mark.
    pub owner: UserId,
    pub placement: Placement,
    pub kind: PlacementKind,
    pub render: RenderKind,
    pub value: String,
    pub status: SignatureStatus,
    pub signer_email: Option<String>,
    pub signed_at: Option<i64>,
    pub share_token: Option<ShareToken>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Placement {
    pub fn new(x: f64, y: f64, page: u32) -> Self {
        Self { x, y, page }
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        for (axis, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() {
                return Err(PlacementError::NonFiniteCoordinate { axis });
            }
            if value < 0.0 {
                return Err(PlacementError::NegativeCoordinate { axis, value });
            }
        }
        if self.page < 1 {
            return Err(PlacementError::PageOutOfRange(self.page));
        }
        Ok(())
    }
}

impl Signature {
    /// Creates a `pending` signature with a generated id.
    pub fn new(
        document_id: DocumentId,
        owner: UserId,
        placement: Placement,
        kind: PlacementKind,
        render: RenderKind,
        value: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            owner,
            placement,
            kind,
            render,
            value: value.into(),
            status: SignatureStatus::Pending,
            signer_email: None,
            signed_at: None,
            share_token: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        self.placement.validate()?;
        if self.value.trim().is_empty() {
            return Err(PlacementError::EmptyValue);
        }
        Ok(())
    }

    pub fn origin(&self) -> SignatureOrigin<'_> {
        match self.share_token.as_ref() {
            Some(token) => SignatureOrigin::External(token),
            None => SignatureOrigin::Owner(self.owner),
        }
    }
}

impl PlacementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Initial => "initial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signature" => Some(Self::Signature),
            "initial" => Some(Self::Initial),
            _ => None,
        }
    }
}

impl RenderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

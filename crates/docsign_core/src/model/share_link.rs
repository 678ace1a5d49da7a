//! Share-link records.
//!
//! # Responsibility
//! - Define the bearer token type and the per-recipient link record.
//! - Apply lifecycle transitions to a link in memory.
//!
//! # Invariants
//! - Tokens are opaque; only the first characters ever reach logs.
//! - A link is expired when `now > expires_at`.
//! - Recipient emails are stored trimmed and lowercase.

use super::lifecycle::{LinkEvent, LinkStatus, SigningOutcome, TransitionError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const TOKEN_LOG_PREFIX_CHARS: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@<>()\[\],;:]+@([A-Za-z0-9-]+\.)+[A-Za-z]{2,}$").expect("valid email regex")
});

/// Bearer capability granting anonymous access to one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Short prefix safe for diagnostics.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(TOKEN_LOG_PREFIX_CHARS).collect();
        format!("{prefix}..")
    }
}

impl Display for ShareToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recipient email rejected at link creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipientError {
    #[error("recipient email is required")]
    Empty,
    #[error("recipient email `{0}` is not a valid address")]
    Malformed(String),
}

/// Share link embedded in its owning document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub token: ShareToken,
    pub recipient_email: String,
    /// Epoch milliseconds; `None` never expires.
    pub expires_at: Option<i64>,
    pub status: LinkStatus,
    pub signed_by: Option<String>,
    /// Set when the link reaches a terminal status through a signing event.
    pub signed_at: Option<i64>,
    pub created_at: i64,
}

impl ShareLink {
    /// Creates a `pending` link.
    pub fn new(
        token: ShareToken,
        recipient_email: impl Into<String>,
        expires_at: Option<i64>,
        now_ms: i64,
    ) -> Self {
        Self {
            token,
            recipient_email: recipient_email.into(),
            expires_at,
            status: LinkStatus::Pending,
            signed_by: None,
            signed_at: None,
            created_at: now_ms,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| now_ms > expires_at)
    }

    /// Applies one lifecycle event and reports whether the status changed.
    pub fn apply(&mut self, event: LinkEvent) -> Result<bool, TransitionError> {
        let next = self.status.on(event)?;
        let changed = next != self.status;
        self.status = next;
        Ok(changed)
    }

    /// Moves the link to the terminal status of `outcome`.
    pub fn complete(
        &mut self,
        outcome: SigningOutcome,
        signed_by: Option<String>,
        at_ms: i64,
    ) -> Result<(), TransitionError> {
        self.apply(outcome.link_event())?;
        self.signed_by = signed_by;
        self.signed_at = Some(at_ms);
        Ok(())
    }
}

/// Trims, lowercases and validates a recipient address.
pub fn normalize_recipient_email(value: &str) -> Result<String, RecipientError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(RecipientError::Empty);
    }
    if !EMAIL_RE.is_match(&normalized) {
        return Err(RecipientError::Malformed(normalized));
    }
    Ok(normalized)
}

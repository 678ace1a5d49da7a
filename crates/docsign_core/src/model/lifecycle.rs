//! Signing lifecycle state machine.
//!
//! # Responsibility
//! - Define the status vocabulary for share links and signatures.
//! - Provide exhaustive transition functions for both record kinds.
//!
//! # Invariants
//! - `signed` and `declined` (`rejected` on the signature side) are terminal.
//! - Re-opening a link past its first view is an idempotent no-op.
//! - Expiry never overrides a terminal status.
//!
//! ```text
//! pending --open--> viewed
//! pending|viewed --expire--> declined     [terminal]
//! pending|viewed --sign--> signed         [terminal]
//! pending|viewed --decline--> declined    [terminal]
//! ```

use serde::{Deserialize, Serialize};

/// Share-link access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Issued, not opened yet.
    Pending,
    /// Opened at least once by the recipient.
    Viewed,
    /// Recipient completed the signature.
    Signed,
    /// Recipient declined, or the link expired before completion.
    Declined,
}

/// Input driving a share-link transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    /// Recipient resolved the token before expiry.
    Open,
    /// Expiry was detected on access.
    Expire,
    /// Recipient submitted a signature.
    Sign,
    /// Recipient declined to sign.
    Decline,
}

/// Signature placement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Rejected,
}

/// Terminal result of one signing event, applied to link and signature together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningOutcome {
    Signed,
    Declined,
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply `{attempted}` to a record in `{from}` state")]
pub struct TransitionError {
    pub from: &'static str,
    pub attempted: &'static str,
}

impl LinkStatus {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Viewed => "viewed",
            Self::Signed => "signed",
            Self::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "viewed" => Some(Self::Viewed),
            "signed" => Some(Self::Signed),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Declined)
    }

    /// Computes the next status for `event`.
    ///
    /// `Open` and `Expire` never fail: on records that are already past the
    /// relevant state they return the current status unchanged. `Sign` and
    /// `Decline` fail on terminal records.
    pub fn on(self, event: LinkEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Pending, LinkEvent::Open) => Ok(Self::Viewed),
            (Self::Viewed | Self::Signed | Self::Declined, LinkEvent::Open) => Ok(self),
            (Self::Pending | Self::Viewed, LinkEvent::Expire) => Ok(Self::Declined),
            (Self::Signed | Self::Declined, LinkEvent::Expire) => Ok(self),
            (Self::Pending | Self::Viewed, LinkEvent::Sign) => Ok(Self::Signed),
            (Self::Pending | Self::Viewed, LinkEvent::Decline) => Ok(Self::Declined),
            (Self::Signed | Self::Declined, LinkEvent::Sign | LinkEvent::Decline) => {
                Err(TransitionError {
                    from: self.as_str(),
                    attempted: event.as_str(),
                })
            }
        }
    }
}

impl LinkEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Expire => "expire",
            Self::Sign => "sign",
            Self::Decline => "decline",
        }
    }
}

impl SignatureStatus {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "signed" => Some(Self::Signed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Rejected)
    }

    /// Computes the status after a requested move to `target`.
    ///
    /// Staying `pending` is a no-op; terminal records accept nothing.
    pub fn advance(self, target: Self) -> Result<Self, TransitionError> {
        match (self, target) {
            (Self::Pending, _) => Ok(target),
            (Self::Signed | Self::Rejected, _) => Err(TransitionError {
                from: self.as_str(),
                attempted: target.as_str(),
            }),
        }
    }

    /// Link-side equivalent of a terminal signature status.
    pub fn terminal_outcome(self) -> Option<SigningOutcome> {
        match self {
            Self::Pending => None,
            Self::Signed => Some(SigningOutcome::Signed),
            Self::Rejected => Some(SigningOutcome::Declined),
        }
    }
}

impl SigningOutcome {
    pub fn link_event(self) -> LinkEvent {
        match self {
            Self::Signed => LinkEvent::Sign,
            Self::Declined => LinkEvent::Decline,
        }
    }

    pub fn link_status(self) -> LinkStatus {
        match self {
            Self::Signed => LinkStatus::Signed,
            Self::Declined => LinkStatus::Declined,
        }
    }

    pub fn signature_status(self) -> SignatureStatus {
        match self {
            Self::Signed => SignatureStatus::Signed,
            Self::Declined => SignatureStatus::Rejected,
        }
    }

    /// Outcome matching a terminal link status, if any.
    pub fn from_link_status(status: LinkStatus) -> Option<Self> {
        match status {
            LinkStatus::Signed => Some(Self::Signed),
            LinkStatus::Declined => Some(Self::Declined),
            LinkStatus::Pending | LinkStatus::Viewed => None,
        }
    }
}

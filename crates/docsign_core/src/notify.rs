//! Share-link notification collaborator.
//!
//! # Responsibility
//! - Describe the message sent to a share-link recipient.
//! - Define the delivery seam; transports live outside core.
//!
//! # Invariants
//! - Delivery failure never rolls back a persisted share link.
//! - Log events carry metadata only (recipient domain, lengths), never the
//!   share URL.

use log::info;

/// Delivery request for one share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkMessage {
    pub recipient: String,
    pub sender_name: String,
    pub document_name: String,
    pub share_url: String,
}

/// Transport-level delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to deliver share link: {0}")]
pub struct DeliveryError(pub String);

/// Delivers share links to recipients.
///
/// Implementations hold their transport handle for the whole process and are
/// shared across requests behind an `Arc`.
pub trait ShareNotifier: Send + Sync {
    fn send_share_link(&self, message: &ShareLinkMessage) -> Result<(), DeliveryError>;
}

impl ShareLinkMessage {
    pub fn subject(&self) -> String {
        format!(
            "Document \"{}\" shared with you for signing",
            self.document_name
        )
    }

    pub fn body_text(&self) -> String {
        format!(
            "Hello,\n\n\
             {sender} has shared the document \"{document}\" with you for your signature.\n\n\
             View and sign the document:\n{url}\n\n\
             This link is unique to you. Please do not share it.\n\n\
             If you did not expect this email, please ignore it.\n",
            sender = self.sender_name,
            document = self.document_name,
            url = self.share_url,
        )
    }

    fn recipient_domain(&self) -> &str {
        self.recipient
            .rsplit_once('@')
            .map_or("unknown", |(_, domain)| domain)
    }
}

/// Notifier that records deliveries in the core log only.
///
/// Used when no outbound transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ShareNotifier for LogNotifier {
    fn send_share_link(&self, message: &ShareLinkMessage) -> Result<(), DeliveryError> {
        info!(
            "event=share_link_delivery module=notify status=ok transport=log recipient_domain={} subject_len={} body_len={}",
            message.recipient_domain(),
            message.subject().len(),
            message.body_text().len()
        );
        Ok(())
    }
}

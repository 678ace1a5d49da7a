//! Trusted caller identity.

use super::UserId;

/// Authenticated owner identity, already verified by the auth collaborator.
///
/// Core never re-verifies credentials; it only compares `user_id` against
/// document ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    /// Human-readable sender name used in share notifications.
    pub display_name: String,
}

impl Principal {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

//! Share token issuer.
//!
//! Tokens are 32 bytes from the OS CSPRNG, hex encoded. Uniqueness is not
//! checked here; the `share_links.token` UNIQUE constraint rejects collisions
//! and callers retry with a fresh token.

use crate::model::share_link::ShareToken;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per token (256 bits of entropy).
pub const TOKEN_BYTES: usize = 32;

/// Issues a new unguessable share token.
pub fn issue_token() -> ShareToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    ShareToken::new(hex::encode(bytes))
}

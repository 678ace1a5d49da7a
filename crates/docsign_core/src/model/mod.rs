//! Signing workflow domain model.
//!
//! # Responsibility
//! - Define the canonical document, share-link and signature records.
//! - Own the explicit lifecycle state machine shared by links and signatures.
//!
//! # Invariants
//! - Model types perform no I/O; persistence lives in `repo`.
//! - Every status change goes through a transition function in `lifecycle`.
//! - Timestamps are Unix epoch milliseconds.

pub mod document;
pub mod lifecycle;
pub mod principal;
pub mod share_link;
pub mod signature;

use uuid::Uuid;

/// Identity of an authenticated user supplied by the auth collaborator.
pub type UserId = Uuid;

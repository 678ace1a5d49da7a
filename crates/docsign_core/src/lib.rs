//! Core domain logic for document signing.
//! This crate is the single source of truth for share-link and signature
//! lifecycle invariants.

pub mod clock;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use content::{ContentError, ContentStore, FsContentStore, Upload};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::document::{Document, DocumentId};
pub use model::lifecycle::{LinkEvent, LinkStatus, SignatureStatus, SigningOutcome};
pub use model::principal::Principal;
pub use model::share_link::{ShareLink, ShareToken};
pub use model::signature::{Placement, PlacementKind, RenderKind, Signature, SignatureId};
pub use model::UserId;
pub use notify::{DeliveryError, LogNotifier, ShareLinkMessage, ShareNotifier};
pub use repo::{RepoError, RepoResult, SigningStore, SqliteSigningStore, StoreScope};
pub use service::document_service::DocumentService;
pub use service::lifecycle_service::{
    LifecycleService, ReconcileFinding, ReconcileReport, ShareSignRequest, SigningReceipt,
};
pub use service::share_link_service::{
    CreateLinkRequest, CreatedLink, ShareLinkService, SharedDocumentView,
};
pub use service::signature_service::{PlaceSignature, SignatureService};

/// Minimal health-check API for operator tooling.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

#![allow(dead_code)]

use docsign_core::db::open_db_in_memory;
use docsign_core::{
    CreateLinkRequest, CreatedLink, DeliveryError, Document, DocumentId, DocumentService,
    FsContentStore, LifecycleService, ManualClock, Placement, PlaceSignature, PlacementKind,
    Principal, RenderKind, ServiceConfig, ShareLinkMessage, ShareLinkService, ShareNotifier,
    Signature, SignatureService, SqliteSigningStore, Upload,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

pub const NOW: i64 = 1_700_000_000_000;
pub const HOUR_MS: i64 = 60 * 60 * 1_000;

/// Notifier that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ShareLinkMessage>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<ShareLinkMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl ShareNotifier for RecordingNotifier {
    fn send_share_link(&self, message: &ShareLinkMessage) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError("smtp unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// One migrated database plus the collaborators every service needs.
pub struct Harness {
    pub conn: Connection,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: ServiceConfig,
    pub uploads: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_conn(open_db_in_memory().unwrap())
    }

    pub fn with_conn(conn: Connection) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            share_base_url: "https://sign.example".to_string(),
            upload_dir: uploads.path().to_path_buf(),
            ..ServiceConfig::default()
        };
        Self {
            conn,
            clock: Arc::new(ManualClock::new(NOW)),
            notifier: Arc::new(RecordingNotifier::default()),
            config,
            uploads,
        }
    }

    pub fn store(&self) -> SqliteSigningStore<'_> {
        SqliteSigningStore::try_new(&self.conn).unwrap()
    }

    pub fn documents(&self) -> DocumentService<SqliteSigningStore<'_>> {
        DocumentService::new(
            self.store(),
            Arc::new(FsContentStore::new(self.uploads.path())),
            self.clock.clone(),
            self.config.max_upload_bytes,
        )
    }

    pub fn links(&self) -> ShareLinkService<SqliteSigningStore<'_>> {
        ShareLinkService::new(
            self.store(),
            self.notifier.clone(),
            self.clock.clone(),
            &self.config,
        )
    }

    pub fn signatures(&self) -> SignatureService<SqliteSigningStore<'_>> {
        SignatureService::new(self.store(), self.clock.clone())
    }

    pub fn lifecycle(&self) -> LifecycleService<SqliteSigningStore<'_>> {
        LifecycleService::new(self.store(), self.clock.clone())
    }

    pub fn upload(&self, owner: &Principal) -> Document {
        self.documents().upload(owner, &pdf_upload("lease.pdf")).unwrap()
    }

    pub fn share(
        &self,
        owner: &Principal,
        document_id: DocumentId,
        expires_at: Option<i64>,
    ) -> CreatedLink {
        self.links()
            .create_link(owner, &link_request(document_id, "bob@x.com", expires_at))
            .unwrap()
    }

    pub fn place(&self, owner: &Principal, document_id: DocumentId) -> Signature {
        self.signatures()
            .place(owner, &placement_request(document_id, 10.0, 20.0, 1))
            .unwrap()
    }

    pub fn link_status(&self, token: &str) -> String {
        self.conn
            .query_row(
                "SELECT status FROM share_links WHERE token = ?1;",
                [token],
                |row| row.get(0),
            )
            .unwrap()
    }

    pub fn signature_status(&self, id: Uuid) -> String {
        self.conn
            .query_row(
                "SELECT status FROM signatures WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .unwrap()
    }
}

pub fn owner(name: &str) -> Principal {
    Principal::new(Uuid::new_v4(), name)
}

pub fn pdf_upload(name: &str) -> Upload {
    Upload {
        original_name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF".to_vec(),
    }
}

pub fn link_request(
    document_id: DocumentId,
    recipient: &str,
    expires_at: Option<i64>,
) -> CreateLinkRequest {
    CreateLinkRequest {
        document_id,
        recipient_email: recipient.to_string(),
        expires_at,
    }
}

pub fn placement_request(document_id: DocumentId, x: f64, y: f64, page: u32) -> PlaceSignature {
    PlaceSignature {
        document_id,
        placement: Placement::new(x, y, page),
        kind: PlacementKind::Signature,
        render: RenderKind::Text,
        value: "Alice Owner".to_string(),
    }
}

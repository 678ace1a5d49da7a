mod common;

use common::{owner, pdf_upload, Harness, NOW};
use docsign_core::model::document::Document;
use docsign_core::{
    ContentStore, ErrorKind, FsContentStore, RepoError, ServiceError, SigningStore, Upload,
};

#[test]
fn upload_records_locator_and_stores_bytes() {
    let h = Harness::new();
    let alice = owner("Alice");

    let document = h.documents().upload(&alice, &pdf_upload(" lease.pdf ")).unwrap();

    assert_eq!(document.owner, alice.user_id);
    assert_eq!(document.original_name, "lease.pdf");
    assert_eq!(document.mime_type, "application/pdf");
    assert!(!document.finalized);
    assert_eq!(document.created_at, NOW);

    let stored = FsContentStore::new(h.uploads.path());
    let bytes = std::fs::read(stored.path_for(&document.content_locator)).unwrap();
    assert_eq!(bytes.len() as u64, document.size_bytes);

    let loaded = h.documents().get(&alice, document.id).unwrap();
    assert_eq!(loaded, document);
}

#[test]
fn upload_rejects_non_pdf_empty_and_oversized_files() {
    let mut h = Harness::new();
    let alice = owner("Alice");

    let image = Upload {
        mime_type: "image/png".to_string(),
        ..pdf_upload("scan.png")
    };
    let err = h.documents().upload(&alice, &image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let empty = Upload {
        bytes: Vec::new(),
        ..pdf_upload("empty.pdf")
    };
    let err = h.documents().upload(&alice, &empty).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.config.max_upload_bytes = 8;
    let err = h.documents().upload(&alice, &pdf_upload("big.pdf")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(h.documents().list_for_owner(&alice).unwrap().is_empty());
}

#[test]
fn documents_are_owner_scoped() {
    let h = Harness::new();
    let alice = owner("Alice");
    let mallory = owner("Mallory");

    let first = h.upload(&alice);
    let second = h.upload(&alice);
    h.upload(&mallory);

    let listed: Vec<_> = h
        .documents()
        .list_for_owner(&alice)
        .unwrap()
        .into_iter()
        .map(|document| document.id)
        .collect();
    assert_eq!(listed, vec![first.id, second.id]);

    let err = h.documents().get(&mallory, first.id).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let err = h.documents().get(&alice, uuid::Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn finalize_is_owner_only_and_rejects_repeat_calls() {
    let h = Harness::new();
    let alice = owner("Alice");
    let mallory = owner("Mallory");
    let document = h.upload(&alice);

    let err = h.documents().finalize(&mallory, document.id).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    h.clock.advance(5_000);
    let finalized = h.documents().finalize(&alice, document.id).unwrap();
    assert!(finalized.finalized);
    assert_eq!(finalized.updated_at, NOW + 5_000);
    assert!(h.documents().get(&alice, document.id).unwrap().finalized);

    let err = h.documents().finalize(&alice, document.id).unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyFinalized(id) if id == document.id));
}

#[test]
fn content_locator_is_unique_in_storage() {
    let h = Harness::new();
    let alice = owner("Alice");
    let existing = h.upload(&alice);

    let clash = Document::new(
        alice.user_id,
        "copy.pdf",
        existing.content_locator.clone(),
        "application/pdf",
        10,
        NOW,
    );
    let err = h
        .store()
        .write(|scope| scope.insert_document(&clash))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateLocator(locator) if locator == existing.content_locator));
}

#[test]
fn content_store_locators_never_repeat() {
    let h = Harness::new();
    let store = FsContentStore::new(h.uploads.path());
    let upload = pdf_upload("a.pdf");
    let first = store.put(&upload).unwrap();
    let second = store.put(&upload).unwrap();
    assert_ne!(first, second);
}

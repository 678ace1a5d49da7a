mod common;

use common::{owner, Harness, HOUR_MS, NOW};
use docsign_core::{
    ErrorKind, LinkStatus, ReconcileFinding, ServiceError, ShareSignRequest, ShareToken,
    SignatureStatus, SigningOutcome,
};
use uuid::Uuid;

fn sign_request(token: &ShareToken, signature_id: Uuid) -> ShareSignRequest {
    ShareSignRequest {
        token: token.clone(),
        signature_id,
        signed_by: "bob@x.com".to_string(),
        value: None,
    }
}

#[test]
fn share_link_signing_end_to_end() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);

    let view = h.links().resolve_by_token(&created.link.token).unwrap();
    assert_eq!(view.link.status, LinkStatus::Viewed);

    h.clock.advance(2_000);
    let receipt = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, signature.id))
        .unwrap();

    assert_eq!(receipt.document_id, document.id);
    assert_eq!(receipt.link.status, LinkStatus::Signed);
    assert_eq!(receipt.link.signed_by.as_deref(), Some("bob@x.com"));
    assert_eq!(receipt.link.signed_at, Some(NOW + 2_000));
    assert_eq!(receipt.signature.status, SignatureStatus::Signed);
    assert_eq!(receipt.signature.signed_at, Some(NOW + 2_000));
    assert_eq!(receipt.signature.value, "Alice Owner");

    assert_eq!(h.link_status(created.link.token.as_str()), "signed");
    assert_eq!(h.signature_status(signature.id), "signed");
}

#[test]
fn decline_moves_both_records_to_terminal_decline() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);

    let receipt = h
        .lifecycle()
        .decline_via_share_token(&created.link.token, signature.id)
        .unwrap();
    assert_eq!(receipt.link.status, LinkStatus::Declined);
    assert_eq!(receipt.link.signed_by.as_deref(), Some("bob@x.com"));
    assert_eq!(receipt.signature.status, SignatureStatus::Rejected);

    assert_eq!(h.link_status(created.link.token.as_str()), "declined");
    assert_eq!(h.signature_status(signature.id), "rejected");

    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, signature.id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[test]
fn terminal_link_rejects_any_further_signing() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let first = h.place(&alice, document.id);
    let second = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);

    h.lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, first.id))
        .unwrap();

    let again = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, first.id))
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidTransition);

    let other = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, second.id))
        .unwrap_err();
    assert_eq!(other.kind(), ErrorKind::InvalidTransition);
    assert_eq!(h.signature_status(second.id), "pending");
}

#[test]
fn signature_value_is_replaced_when_supplied() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);

    let mut request = sign_request(&created.link.token, signature.id);
    request.value = Some("Bob Recipient".to_string());
    let receipt = h.lifecycle().sign_via_share_token(&request).unwrap();
    assert_eq!(receipt.signature.value, "Bob Recipient");
    assert_eq!(
        h.signatures().get(&alice, signature.id).unwrap().value,
        "Bob Recipient"
    );
}

#[test]
fn invalid_requests_fail_before_touching_storage() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);

    let mut request = sign_request(&created.link.token, signature.id);
    request.signed_by = "  ".to_string();
    let err = h.lifecycle().sign_via_share_token(&request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = sign_request(&created.link.token, signature.id);
    request.value = Some(String::new());
    let err = h.lifecycle().sign_via_share_token(&request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&ShareToken::new("unknown"), signature.id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOrExpiredLink));

    assert_eq!(h.link_status(created.link.token.as_str()), "pending");
    assert_eq!(h.signature_status(signature.id), "pending");
}

#[test]
fn mismatched_document_leaves_both_records_untouched() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let other = h.upload(&alice);
    let foreign_signature = h.place(&alice, other.id);
    let created = h.share(&alice, document.id, None);
    h.links().resolve_by_token(&created.link.token).unwrap();

    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, foreign_signature.id))
        .unwrap_err();
    match err {
        ServiceError::DocumentMismatch {
            signature_id,
            document_id,
        } => {
            assert_eq!(signature_id, foreign_signature.id);
            assert_eq!(document_id, document.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.link_status(created.link.token.as_str()), "viewed");
    assert_eq!(h.signature_status(foreign_signature.id), "pending");

    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, Uuid::new_v4()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn expired_link_is_declined_and_signature_stays_pending() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, Some(NOW + HOUR_MS));

    h.clock.advance(HOUR_MS + 1);
    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, signature.id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOrExpiredLink));
    assert_eq!(err.public_message(), ServiceError::Expired.public_message());

    assert_eq!(h.link_status(created.link.token.as_str()), "declined");
    assert_eq!(h.signature_status(signature.id), "pending");
}

#[test]
fn already_terminal_signature_rolls_back_link_update() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    h.signatures()
        .update_status(signature.id, SignatureStatus::Rejected, None)
        .unwrap();

    let err = h
        .lifecycle()
        .sign_via_share_token(&sign_request(&created.link.token, signature.id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    assert_eq!(h.link_status(created.link.token.as_str()), "pending");
    assert_eq!(h.signature_status(signature.id), "rejected");
}

#[test]
fn reconcile_repairs_link_behind_signed_signature() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    h.conn
        .execute(
            "UPDATE signatures
             SET status = 'signed', signer_email = 'bob@x.com', signed_at = ?1, share_token = ?2
             WHERE id = ?3;",
            rusqlite::params![
                NOW + 10,
                created.link.token.as_str(),
                signature.id.to_string()
            ],
        )
        .unwrap();

    let report = h.lifecycle().reconcile_document(document.id).unwrap();
    assert_eq!(
        report.findings,
        vec![ReconcileFinding::LinkBehindSignature {
            signature_id: signature.id,
            signature_status: SignatureStatus::Signed,
        }]
    );
    assert_eq!(report.repaired, 1);

    let stored = h.documents().get(&alice, document.id).unwrap();
    let link = stored.link(&created.link.token).unwrap();
    assert_eq!(link.status, LinkStatus::Signed);
    assert_eq!(link.signed_by.as_deref(), Some("bob@x.com"));
    assert_eq!(link.signed_at, Some(NOW + 10));

    assert!(h
        .lifecycle()
        .reconcile_document(document.id)
        .unwrap()
        .is_consistent());
}

#[test]
fn reconcile_repairs_signature_behind_declined_link() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    h.links()
        .mark_terminal(&created.link.token, SigningOutcome::Declined, None)
        .unwrap();
    h.conn
        .execute(
            "UPDATE signatures SET share_token = ?1 WHERE id = ?2;",
            [created.link.token.as_str(), signature.id.to_string().as_str()],
        )
        .unwrap();

    let report = h.lifecycle().reconcile_document(document.id).unwrap();
    assert_eq!(
        report.findings,
        vec![ReconcileFinding::SignatureBehindLink {
            signature_id: signature.id,
            link_status: LinkStatus::Declined,
        }]
    );
    assert_eq!(report.repaired, 1);
    assert_eq!(h.signature_status(signature.id), "rejected");
}

#[test]
fn reconcile_reports_conflicts_and_missing_links_without_repair() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let other = h.upload(&alice);
    let conflicted = h.place(&alice, document.id);
    let orphaned = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    let foreign = h.share(&alice, other.id, None);

    h.links()
        .mark_terminal(&created.link.token, SigningOutcome::Declined, None)
        .unwrap();
    h.conn
        .execute(
            "UPDATE signatures SET status = 'signed', share_token = ?1 WHERE id = ?2;",
            [created.link.token.as_str(), conflicted.id.to_string().as_str()],
        )
        .unwrap();
    h.conn
        .execute(
            "UPDATE signatures SET share_token = ?1 WHERE id = ?2;",
            [foreign.link.token.as_str(), orphaned.id.to_string().as_str()],
        )
        .unwrap();

    let report = h.lifecycle().reconcile_document(document.id).unwrap();
    assert_eq!(report.repaired, 0);
    assert_eq!(
        report.findings,
        vec![
            ReconcileFinding::ConflictingOutcomes {
                signature_id: conflicted.id,
                link_status: LinkStatus::Declined,
                signature_status: SignatureStatus::Signed,
            },
            ReconcileFinding::MissingLink {
                signature_id: orphaned.id,
            },
        ]
    );
    assert_eq!(h.signature_status(conflicted.id), "signed");
    assert_eq!(h.link_status(created.link.token.as_str()), "declined");
}

#[test]
fn reconcile_only_reports_on_finalized_documents() {
    let h = Harness::new();
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    h.conn
        .execute(
            "UPDATE signatures SET status = 'signed', share_token = ?1 WHERE id = ?2;",
            [created.link.token.as_str(), signature.id.to_string().as_str()],
        )
        .unwrap();
    h.documents().finalize(&alice, document.id).unwrap();

    let report = h.lifecycle().reconcile_document(document.id).unwrap();
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.repaired, 0);
    assert_eq!(h.link_status(created.link.token.as_str()), "pending");
}

#[test]
fn reconcile_all_returns_only_documents_with_findings() {
    let h = Harness::new();
    let alice = owner("Alice");
    let clean = h.upload(&alice);
    h.place(&alice, clean.id);
    let broken = h.upload(&alice);
    let signature = h.place(&alice, broken.id);
    let created = h.share(&alice, broken.id, None);
    h.conn
        .execute(
            "UPDATE signatures SET status = 'signed', share_token = ?1 WHERE id = ?2;",
            [created.link.token.as_str(), signature.id.to_string().as_str()],
        )
        .unwrap();

    let reports = h.lifecycle().reconcile_all().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].document_id, broken.id);
    assert_eq!(reports[0].repaired, 1);

    assert!(h.lifecycle().reconcile_all().unwrap().is_empty());
}

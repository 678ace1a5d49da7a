mod common;

use common::{owner, Harness, NOW};
use docsign_core::db::open_db;
use docsign_core::{
    ErrorKind, LifecycleService, LinkStatus, ManualClock, ShareLinkService, ShareSignRequest,
    SqliteSigningStore,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_signers_produce_exactly_one_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docsign.db");
    let h = Harness::with_conn(open_db(&path).unwrap());
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let signature = h.place(&alice, document.id);
    let created = h.share(&alice, document.id, None);
    h.links().resolve_by_token(&created.link.token).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let clock = Arc::new(ManualClock::new(NOW + 1_000));
    let workers: Vec<_> = ["bob@x.com", "bob.phone@x.com"]
        .into_iter()
        .map(|signer| {
            let barrier = Arc::clone(&barrier);
            let clock = Arc::clone(&clock);
            let path = path.clone();
            let request = ShareSignRequest {
                token: created.link.token.clone(),
                signature_id: signature.id,
                signed_by: signer.to_string(),
                value: None,
            };
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let store = SqliteSigningStore::try_new(&conn).unwrap();
                let lifecycle = LifecycleService::new(store, clock);
                barrier.wait();
                lifecycle
                    .sign_via_share_token(&request)
                    .map(|receipt| receipt.link.signed_by)
                    .map_err(|err| err.kind())
            })
        })
        .collect();

    let results: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(winners.len(), 1, "results: {results:?}");
    assert_eq!(losers.len(), 1, "results: {results:?}");
    assert!(matches!(
        losers[0],
        ErrorKind::InvalidTransition | ErrorKind::InvalidOrExpiredLink
    ));

    let stored = h.documents().get(&alice, document.id).unwrap();
    let link = stored.link(&created.link.token).unwrap();
    assert_eq!(link.status, LinkStatus::Signed);
    assert_eq!(&link.signed_by, winners[0]);
    assert_eq!(h.signature_status(signature.id), "signed");
}

#[test]
fn concurrent_resolves_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docsign.db");
    let h = Harness::with_conn(open_db(&path).unwrap());
    let alice = owner("Alice");
    let document = h.upload(&alice);
    let created = h.share(&alice, document.id, None);

    let barrier = Arc::new(Barrier::new(4));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let clock = Arc::clone(&h.clock);
            let notifier = Arc::clone(&h.notifier);
            let config = h.config.clone();
            let path = path.clone();
            let token = created.link.token.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let store = SqliteSigningStore::try_new(&conn).unwrap();
                let links = ShareLinkService::new(store, notifier, clock, &config);
                barrier.wait();
                links.resolve_by_token(&token).map(|view| view.link.status)
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap().unwrap(), LinkStatus::Viewed);
    }
    assert_eq!(h.link_status(created.link.token.as_str()), "viewed");
}

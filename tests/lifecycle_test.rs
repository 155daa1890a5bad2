//! End-to-end petition and poll lifecycles against the in-memory store

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};
use townhall::auth::Principal;
use townhall::db::schemas::{PetitionStatus, PollStatus};
use townhall::services::{NewPetition, NewPoll, PageLimits, Services};
use townhall::store::{DateWindow, MemoryStore, RecordStore};
use townhall::types::{CivicError, ConflictKind, ErrorKind};

fn services() -> (Arc<MemoryStore>, Services) {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), PageLimits::default());
    (store, services)
}

fn petition(title: &str, location: &str) -> NewPetition {
    NewPetition {
        title: Some(title.into()),
        description: Some("Potholes all along the road".into()),
        category: Some("Infrastructure".into()),
        location: Some(location.into()),
        goal: Some(50),
    }
}

#[tokio::test]
async fn petition_lifecycle_scenario() {
    let (store, svc) = services();
    let c1 = Principal::citizen("c1", "Austin");
    let c2 = Principal::citizen("c2", "Austin");
    let o1 = Principal::official("o1", "Austin");

    let created = assert_ok!(svc.petitions.create(&c1, petition("Fix Road", "Austin")).await);
    assert_eq!(created.status, PetitionStatus::Active);
    assert_eq!(created.signature_count, 0);
    let id = created.id_hex();

    assert_eq!(assert_ok!(svc.petitions.sign(&c2, &id).await), 1);

    let reviewed = assert_ok!(
        svc.governance
            .respond(&o1, &id, "Under investigation", Some("under_review"))
            .await
    );
    assert_eq!(reviewed.status, PetitionStatus::UnderReview);
    assert_eq!(
        reviewed.official_response.map(|r| r.comment).as_deref(),
        Some("Under investigation")
    );
    assert_eq!(store.admin_logs().await.len(), 1);

    let closed = assert_ok!(svc.petitions.change_status(&o1, &id, Some("closed")).await);
    assert_eq!(closed.status, PetitionStatus::Closed);

    let err = assert_err!(
        svc.governance
            .respond(&o1, &id, "One more thing", Some("closed"))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::StateError);
    assert_eq!(store.admin_logs().await.len(), 1);
}

#[tokio::test]
async fn signature_count_matches_rows() {
    let (store, svc) = services();
    let c1 = Principal::citizen("c1", "Austin");
    let created = assert_ok!(svc.petitions.create(&c1, petition("Fix Road", "Austin")).await);
    let id = created.id_hex();
    let oid = created._id.unwrap();

    for n in 0..5 {
        let signer = Principal::citizen(format!("s{n}"), "Austin");
        assert_ok!(svc.petitions.sign(&signer, &id).await);
        let err = assert_err!(svc.petitions.sign(&signer, &id).await);
        assert!(matches!(err, CivicError::Conflict(ConflictKind::AlreadySigned)));
    }

    let stored = assert_ok!(svc.petitions.get(&id).await);
    assert_eq!(stored.signature_count, 5);
    assert_eq!(assert_ok!(store.count_signatures(&oid).await), 5);
}

#[tokio::test]
async fn citizens_never_change_status() {
    let (_, svc) = services();
    let c1 = Principal::citizen("c1", "Austin");
    let id = assert_ok!(svc.petitions.create(&c1, petition("Fix Road", "Austin")).await).id_hex();

    for who in [c1.clone(), Principal::citizen("c2", "Dallas")] {
        for status in [Some("closed"), Some("under_review"), Some("bogus"), Some(""), None] {
            let err = assert_err!(svc.petitions.change_status(&who, &id, status).await);
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
    }
}

#[tokio::test]
async fn poll_lifecycle() {
    let (_, svc) = services();
    let o1 = Principal::official("o1", "Austin");

    let one = NewPoll {
        title: Some("New park?".into()),
        target_location: Some("Austin".into()),
        options: vec!["Yes".into()],
        ..NewPoll::default()
    };
    let err = assert_err!(svc.polls.create(&o1, one.clone()).await);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let two = NewPoll {
        options: vec!["Yes".into(), "No".into()],
        ..one
    };
    let poll = assert_ok!(svc.polls.create(&o1, two).await);
    assert!(poll.options.iter().all(|o| o.votes == 0));
    let id = poll.id_hex();

    let c1 = Principal::citizen("c1", "Austin");
    let err = assert_err!(svc.polls.vote(&c1, &id, Some(2)).await);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let unchanged = assert_ok!(svc.polls.get(&id).await);
    assert!(unchanged.voters.is_empty());
    assert_eq!(unchanged.total_votes(), 0);

    let voted = assert_ok!(svc.polls.vote(&c1, &id, Some(0)).await);
    assert_eq!(voted.total_votes() as usize, voted.voters.len());

    let err = assert_err!(svc.polls.vote(&c1, &id, Some(1)).await);
    assert!(matches!(err, CivicError::Conflict(ConflictKind::AlreadyVoted)));

    let closed = assert_ok!(svc.polls.close(&o1, &id).await);
    assert_eq!(closed.status, PollStatus::Closed);
}

#[tokio::test]
async fn report_isolation() {
    let (_, svc) = services();
    let c1 = Principal::citizen("c1", "Austin");
    let o1 = Principal::official("o1", "Austin");

    let austin_a = assert_ok!(svc.petitions.create(&c1, petition("A", "Austin")).await).id_hex();
    assert_ok!(svc.petitions.create(&c1, petition("B", "austin")).await);
    assert_ok!(svc.petitions.create(&c1, petition("C", "Dallas")).await);
    assert_ok!(svc.petitions.sign(&Principal::citizen("c2", "Austin"), &austin_a).await);
    assert_ok!(
        svc.governance
            .respond(&o1, &austin_a, "Looking", Some("under_review"))
            .await
    );

    let report = assert_ok!(svc.reports.report("Austin", &DateWindow::unbounded()).await);
    let p = &report.petitions;
    assert_eq!(p.total, 2);
    assert_eq!(p.active + p.under_review + p.closed, p.total);
    assert_eq!(p.under_review, 1);
    assert_eq!(report.totals.total_signatures, 1);

    let dallas = assert_ok!(svc.reports.report("Dallas", &DateWindow::unbounded()).await);
    assert_eq!(dallas.petitions.total, 1);
    assert_eq!(dallas.totals.total_signatures, 0);

    let err = assert_err!(svc.reports.report("", &DateWindow::unbounded()).await);
    assert!(matches!(err, CivicError::LocationRequired));
}

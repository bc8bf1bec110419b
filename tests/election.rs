//! Election rounds against the in-memory coordination service

use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use zkelect::common::Config;
use zkelect::coordination::{MemoryConnector, MemoryService};
use zkelect::{
    leadership_channel, start_with, ElectionEngine, ElectionSettings, ElectionState, Error,
    LeadershipReceiver,
};

const ROOT: &str = "/GOLANG_ELECTING_MASTER";
const MARKER: &str = "/GOLANG_ELECTING_MASTER/MASTER";

fn settings(target: &str) -> ElectionSettings {
    Config {
        target: target.to_string(),
        ..Default::default()
    }
    .settings()
    .unwrap()
}

fn participant(
    service: &MemoryService,
) -> (ElectionEngine<MemoryConnector>, LeadershipReceiver) {
    let (tx, rx) = leadership_channel();
    let engine = ElectionEngine::new(
        service.connector(),
        settings("zk1:2181,zk2:2181"),
        tx,
    );
    (engine, rx)
}

#[tokio::test]
async fn first_election_on_empty_namespace_wins() {
    let service = MemoryService::new();
    let (mut engine, mut rx) = participant(&service);

    let elected = assert_ok!(engine.elect_master().await);
    assert!(elected);
    assert_eq!(engine.state(), ElectionState::Elected);
    assert!(service.contains(ROOT));
    assert!(service.contains(MARKER));
    assert_eq!(service.ephemeral_owner(ROOT), None);
    assert_eq!(
        service.ephemeral_owner(MARKER),
        engine.session().map(|s| s.id())
    );

    assert_eq!(rx.recv().await, Some(true));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn second_participant_stands_by_without_touching_marker() {
    let service = MemoryService::new();
    let (mut leader, mut leader_rx) = participant(&service);
    let (mut follower, mut follower_rx) = participant(&service);

    assert!(assert_ok!(leader.elect_master().await));
    let owner = service.ephemeral_owner(MARKER);

    assert!(!assert_ok!(follower.elect_master().await));
    assert_eq!(follower.state(), ElectionState::Standby);
    assert_eq!(service.ephemeral_owner(MARKER), owner);

    assert_eq!(leader_rx.recv().await, Some(true));
    assert_eq!(follower_rx.recv().await, Some(false));
    assert!(follower_rx.try_recv().is_err());
}

#[tokio::test]
async fn repeated_rounds_emit_every_outcome() {
    let service = MemoryService::new();
    let (mut leader, _leader_rx) = participant(&service);
    let (mut follower, mut rx) = participant(&service);

    leader.elect_master().await.unwrap();
    follower.elect_master().await.unwrap();
    follower.elect_master().await.unwrap();

    // no deduplication of identical outcomes
    assert_eq!(rx.recv().await, Some(false));
    assert_eq!(rx.recv().await, Some(false));
}

#[tokio::test]
async fn root_created_once() {
    let service = MemoryService::new();
    let (mut a, _rx_a) = participant(&service);
    let (mut b, _rx_b) = participant(&service);

    a.elect_master().await.unwrap();
    a.elect_master().await.unwrap();
    b.elect_master().await.unwrap();

    assert_eq!(service.create_calls(ROOT), 1);
    assert_eq!(service.create_calls(MARKER), 3);
}

#[tokio::test]
async fn namespace_from_target() {
    let service = MemoryService::new();
    let (tx, mut rx) = leadership_channel();
    let mut engine =
        ElectionEngine::new(service.connector(), settings("h1:2181,h2:2181/myapp"), tx);

    assert!(engine.elect_master().await.unwrap());
    assert!(service.contains("/myapp/MASTER"));
    assert!(!service.contains(ROOT));
    assert_eq!(rx.recv().await, Some(true));
}

#[tokio::test]
async fn marker_path_mismatch_publishes_nothing() {
    let service = MemoryService::new();
    service.rewrite_created_path(MARKER, "/GOLANG_ELECTING_MASTER/MASTER0000000001");
    let (mut engine, mut rx) = participant(&service);

    let err = assert_err!(engine.elect_master().await);
    assert!(matches!(
        err,
        Error::ProtocolInvariant { ref expected, .. } if expected == MARKER
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn root_path_mismatch_publishes_nothing() {
    let service = MemoryService::new();
    service.rewrite_created_path(ROOT, "/elsewhere");
    let (mut engine, mut rx) = participant(&service);

    assert!(matches!(
        engine.elect_master().await,
        Err(Error::ProtocolInvariant { .. })
    ));
    assert!(!service.contains(MARKER));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn racing_participants_elect_exactly_one() {
    let service = MemoryService::new();
    let (mut a, mut rx_a) = participant(&service);
    let (mut b, mut rx_b) = participant(&service);

    let (ra, rb) = tokio::join!(a.elect_master(), b.elect_master());
    let (ra, rb) = (assert_ok!(ra), assert_ok!(rb));
    assert!(ra ^ rb);

    let (oa, ob) = (rx_a.recv().await.unwrap(), rx_b.recv().await.unwrap());
    assert_eq!(oa, ra);
    assert_eq!(ob, rb);
}

#[tokio::test(start_paused = true)]
async fn unreachable_service_times_out_startup() {
    let service = MemoryService::new();
    service.set_unreachable(true);
    let (tx, mut rx) = leadership_channel();

    let result = start_with(service.connector(), settings("zk1:2181"), tx).await;
    match result {
        Err(Error::ConnectTimeout(timeout)) => assert_eq!(timeout, Duration::from_secs(3)),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("election started against an unreachable service"),
    }
    assert_eq!(rx.recv().await, None);
}

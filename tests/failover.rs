//! Re-election after the leader marker disappears

use std::time::Duration;
use zkelect::common::Config;
use zkelect::coordination::{Connector, CreateMode, MemoryService, Session};
use zkelect::{leadership_channel, start_with, ElectionHandle, LeadershipReceiver};

const MARKER: &str = "/GOLANG_ELECTING_MASTER/MASTER";

async fn join(service: &MemoryService) -> (ElectionHandle, LeadershipReceiver) {
    join_with_retry(service, 10).await
}

async fn join_with_retry(
    service: &MemoryService,
    retry_interval_ms: u64,
) -> (ElectionHandle, LeadershipReceiver) {
    let settings = Config {
        target: "zk1:2181".to_string(),
        retry_interval_ms,
        ..Default::default()
    }
    .settings()
    .unwrap();

    let (tx, rx) = leadership_channel();
    let handle = start_with(service.connector(), settings, tx).await.unwrap();
    (handle, rx)
}

async fn next_outcome(rx: &mut LeadershipReceiver) -> bool {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no leadership outcome within 5s")
        .expect("leadership channel closed")
}

/// Let the background loops reach their next wait
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn marker_deletion_triggers_one_reelection() {
    let service = MemoryService::new();
    let (handle, mut rx) = join(&service).await;
    assert!(next_outcome(&mut rx).await);
    settle().await;

    service.delete(MARKER).unwrap();

    assert!(next_outcome(&mut rx).await);
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(service.create_calls(MARKER), 2);
    assert!(service.contains(MARKER));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn standby_takes_over_when_leader_session_expires() {
    let service = MemoryService::new();
    let (leader, mut leader_rx) = join(&service).await;
    let (follower, mut follower_rx) = join(&service).await;
    assert!(leader.initially_elected());
    assert!(!follower.initially_elected());
    assert!(next_outcome(&mut leader_rx).await);
    assert!(!next_outcome(&mut follower_rx).await);
    settle().await;

    let leader_session = service.ephemeral_owner(MARKER).unwrap();
    service.expire_session(leader_session);

    // both loops see the deletion; exactly one wins the new round
    let old_leader = next_outcome(&mut leader_rx).await;
    let old_follower = next_outcome(&mut follower_rx).await;
    assert!(old_leader ^ old_follower);

    let new_owner = service.ephemeral_owner(MARKER).unwrap();
    assert_ne!(new_owner, leader_session);

    settle().await;
    assert!(leader_rx.try_recv().is_err());
    assert!(follower_rx.try_recv().is_err());

    leader.shutdown().await.unwrap();
    follower.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_standby_reconnects_and_stays_standby() {
    let service = MemoryService::new();
    let (leader, mut leader_rx) = join(&service).await;
    let (follower, mut follower_rx) = join(&service).await;
    assert!(next_outcome(&mut leader_rx).await);
    assert!(!next_outcome(&mut follower_rx).await);
    settle().await;

    let leader_session = service.ephemeral_owner(MARKER).unwrap();
    let opened = service.sessions_opened();
    // the follower holds the newest session
    service.expire_session(opened);

    assert!(!next_outcome(&mut follower_rx).await);
    assert_eq!(service.sessions_opened(), opened + 1);
    assert_eq!(service.ephemeral_owner(MARKER), Some(leader_session));
    assert!(leader_rx.try_recv().is_err());

    leader.shutdown().await.unwrap();
    follower.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_stops_reelection() {
    let service = MemoryService::new();
    let (handle, mut rx) = join(&service).await;
    assert!(next_outcome(&mut rx).await);
    settle().await;
    assert_eq!(service.pending_watches(), 1);

    handle.shutdown().await.unwrap();

    service.delete(MARKER).unwrap();
    assert_eq!(rx.recv().await, None);
    assert_eq!(service.create_calls(MARKER), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_claim_on_vacant_marker_backs_off() {
    let service = MemoryService::new();

    // an ephemeral root cannot hold the marker, so every claim fails
    // while the marker stays vacant
    let squatter = service.connector().connect(&[]).await.unwrap();
    squatter
        .create("/GOLANG_ELECTING_MASTER", b"", CreateMode::Ephemeral)
        .await
        .unwrap();

    let (handle, mut rx) = join_with_retry(&service, 200).await;
    assert!(!handle.initially_elected());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let calls = service.create_calls(MARKER);
    assert!(calls <= 3, "marker claimed {} times in 300ms", calls);
    let mut outcomes = 0;
    while let Ok(outcome) = rx.try_recv() {
        assert!(!outcome);
        outcomes += 1;
    }
    assert!(outcomes <= 3, "{} outcomes in 300ms", outcomes);
    assert!(!service.contains(MARKER));

    handle.shutdown().await.unwrap();
}

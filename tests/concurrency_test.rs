//! Concurrency tests for the room registry and sessions.

mod common;

use std::sync::Arc;

use huddle::chat::{Member, RoomEvent, RoomRegistry};
use tokio::sync::mpsc;
use uuid::Uuid;

use common::{memory_service, wait_for_members, TestPeer};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_joiners_share_one_room() {
    const JOINERS: usize = 24;
    let names: Vec<String> = (0..JOINERS).map(|i| format!("user{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let service = memory_service(&refs, false);

    let mut handles = Vec::new();
    for name in names.clone() {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            TestPeer::join(&service, &name, "fresh").await.0
        }));
    }

    let mut peers = Vec::new();
    for handle in handles {
        peers.push(handle.await.unwrap());
    }

    assert_eq!(service.registry().room_count(), 1);
    wait_for_members(service.registry(), "fresh", JOINERS).await;

    // Every joiner is in the same room: one message reaches all others.
    peers[0].say("roll call");
    for peer in peers.iter_mut().skip(1) {
        let (sender, text, _) = peer.next_message().await;
        assert_eq!(sender, "user0");
        assert_eq!(text, "roll call");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_leave_churn_never_strands_a_joiner() {
    let registry = RoomRegistry::with_presence(false);

    let mut handles = Vec::new();
    for task in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            for round in 0..50 {
                let (tx, _rx) = mpsc::channel::<Arc<RoomEvent>>(4);
                let session_id = Uuid::new_v4();

                // Mirror the session's single retry on a room closed mid-join.
                let mut joined = None;
                for _ in 0..2 {
                    let room = registry.resolve_or_create("churn");
                    let member = Member::new(session_id, format!("t{task}-{round}"), tx.clone());
                    if let Ok((membership, _)) = room.join(member).await {
                        joined = Some((room, membership));
                        break;
                    }
                }

                let (room, membership) = joined.expect("join failed twice");
                // A successful joiner always sits in the registered instance.
                let registered = registry.get("churn").expect("room vanished while occupied");
                assert!(Arc::ptr_eq(&room, &registered));
                assert!(membership.leave().await);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rooms_keep_their_own_order() {
    let service = memory_service(&["alice", "bob", "carol", "dave"], false);

    let (alice, _) = TestPeer::join(&service, "alice", "left").await;
    let (mut bob, _) = TestPeer::join(&service, "bob", "left").await;
    let (carol, _) = TestPeer::join(&service, "carol", "right").await;
    let (mut dave, _) = TestPeer::join(&service, "dave", "right").await;

    for i in 0..100 {
        alice.say(&format!("l{i}"));
        carol.say(&format!("r{i}"));
    }
    for i in 0..100 {
        assert_eq!(bob.next_message().await.1, format!("l{i}"));
        assert_eq!(dave.next_message().await.1, format!("r{i}"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mass_disconnect_empties_registry() {
    let names: Vec<String> = (0..16).map(|i| format!("user{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let service = memory_service(&refs, true);

    let mut peers = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let room = if i % 2 == 0 { "even" } else { "odd" };
        peers.push(TestPeer::join(&service, name, room).await.0);
    }
    assert_eq!(service.registry().room_count(), 2);

    let mut handles = Vec::new();
    for peer in peers {
        handles.push(tokio::spawn(peer.disconnect()));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(service.registry().room_count(), 0);
}

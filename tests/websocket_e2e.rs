//! End-to-end tests over real WebSockets.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use huddle::chat::{codes, ServerFrame};
use huddle::client::{ChatClient, ClientError};
use huddle::Config;

use common::{wait_for_members, TestServer, DEFAULT_TIMEOUT, PASSWORD};

fn test_config() -> Config {
    let mut config = Config::default();
    config.chat.presence_notifications = false;
    config
}

async fn next_frame(client: &mut ChatClient) -> Option<ServerFrame> {
    timeout(DEFAULT_TIMEOUT, client.next_frame())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
}

#[tokio::test]
async fn test_alice_and_bob_over_websocket() {
    let server = TestServer::start(test_config()).await;
    server.add_user("alice").await;
    server.add_user("bob").await;

    let mut alice = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "r1")
        .await
        .unwrap();
    assert_eq!(alice.room_id(), "r1");
    assert_eq!(alice.members(), ["alice"]);

    let mut bob = ChatClient::connect(&server.ws_url(), "bob", PASSWORD, "r1")
        .await
        .unwrap();
    assert_eq!(bob.members(), ["alice", "bob"]);

    alice.send("hello").await.unwrap();
    match next_frame(&mut bob).await {
        Some(ServerFrame::Message {
            sender,
            text,
            room_id,
            timestamp,
            ..
        }) => {
            assert_eq!(sender, "alice");
            assert_eq!(text, "hello");
            assert_eq!(room_id, "r1");
            assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
        }
        other => panic!("expected a message, got {other:?}"),
    }

    // Nothing comes back to the sender.
    assert!(timeout(Duration::from_millis(100), alice.next_frame())
        .await
        .is_err());

    bob.close().await.unwrap();
    alice.close().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_over_websocket() {
    let server = TestServer::start(test_config()).await;
    server.add_user("alice").await;

    let result = ChatClient::connect(&server.ws_url(), "alice", "wrong-password", "r1").await;
    match result {
        Err(ClientError::Rejected { code, .. }) => assert_eq!(code, codes::AUTH_FAILED),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("login with a wrong password succeeded"),
    }
}

#[tokio::test]
async fn test_raw_frames_and_close() {
    let server = TestServer::start(test_config()).await;
    server.add_user("alice").await;

    let (mut ws, _) = connect_async(server.ws_url()).await.unwrap();
    ws.send(Message::text(r#"{"username":"alice","password":"password123"}"#))
        .await
        .unwrap();
    ws.send(Message::text(r#"{"room_id":"raw"}"#)).await.unwrap();

    let reply = timeout(DEFAULT_TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
    assert_eq!(value["type"], "joined");
    assert_eq!(value["room_id"], "raw");
    assert_eq!(value["members"], serde_json::json!(["alice"]));

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_disconnected_peer_leaves_room() {
    let server = TestServer::start(test_config()).await;
    server.add_user("alice").await;
    server.add_user("bob").await;

    let mut alice = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "r1")
        .await
        .unwrap();
    let bob = ChatClient::connect(&server.ws_url(), "bob", PASSWORD, "r1")
        .await
        .unwrap();

    // Drop the socket without a close handshake.
    drop(bob);
    wait_for_members(server.chat.registry(), "r1", 1).await;

    alice.send("ping").await.unwrap();
    let mut bob_again = ChatClient::connect(&server.ws_url(), "bob", PASSWORD, "r1")
        .await
        .unwrap();
    assert_eq!(bob_again.members(), ["alice", "bob"]);

    alice.send("after").await.unwrap();
    match next_frame(&mut bob_again).await {
        Some(ServerFrame::Message { text, .. }) => assert_eq!(text, "after"),
        other => panic!("expected a message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_limit() {
    let mut config = test_config();
    config.server.max_connections = 1;
    let server = TestServer::start(config).await;
    server.add_user("alice").await;

    let _first = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "r1")
        .await
        .unwrap();

    let second = connect_async(server.ws_url()).await;
    assert!(second.is_err(), "second connection should be refused");
}

#[tokio::test]
async fn test_unknown_room_when_registration_required() {
    let mut config = test_config();
    config.chat.require_registered_rooms = true;
    let server = TestServer::start(config).await;
    server.add_user("alice").await;

    let result = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "nowhere").await;
    match result {
        Err(ClientError::Rejected { code, reason }) => {
            assert_eq!(code, codes::JOIN_FAILED);
            assert_eq!(reason, "room nowhere does not exist");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("joined an unregistered room"),
    }

    huddle::db::RoomRepository::new(server.db.pool())
        .create("somewhere", None)
        .await
        .unwrap();
    let client = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "somewhere")
        .await
        .unwrap();
    assert_eq!(client.room_id(), "somewhere");
}

//! Test helpers for integration tests.
//!
//! Provides an in-memory chat peer driven through a real `ChatService`, and a
//! WebSocket server bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use huddle::chat::{
    memory_pair, ChatService, EphemeralRooms, MemoryPeer, RoomRegistry, RoomStore, ServerFrame,
    SessionError, SessionSettings,
};
use huddle::web::{build_state, WebServer};
use huddle::{Config, Database, MemoryAccounts};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding that nothing will arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Password shared by every account created by the helpers.
pub const PASSWORD: &str = "password123";

/// A chat service backed by in-memory accounts.
pub fn memory_service(usernames: &[&str], presence: bool) -> ChatService {
    memory_service_with(usernames, presence, Arc::new(EphemeralRooms), SessionSettings::default())
}

pub fn memory_service_with(
    usernames: &[&str],
    presence: bool,
    rooms: Arc<dyn RoomStore>,
    settings: SessionSettings,
) -> ChatService {
    let accounts = MemoryAccounts::with_accounts(usernames.iter().map(|name| (*name, PASSWORD)));
    ChatService::new(
        RoomRegistry::with_presence(presence),
        Arc::new(accounts),
        rooms,
        settings,
    )
}

/// Client side of a session served over an in-memory connection.
pub struct TestPeer {
    pub peer: MemoryPeer,
    pub session: JoinHandle<Result<(), SessionError>>,
}

impl TestPeer {
    /// Open a connection and send credentials, without joining yet.
    pub fn start(service: &ChatService, username: &str, password: &str) -> Self {
        let (conn, peer) = memory_pair();
        let service = service.clone();
        let session = tokio::spawn(async move { service.serve(conn).await });

        peer.send_json(&json!({"username": username, "password": password}));
        Self { peer, session }
    }

    /// Authenticate and join `room_id`, returning the members list.
    pub async fn join(service: &ChatService, username: &str, room_id: &str) -> (Self, Vec<String>) {
        let mut peer = Self::start(service, username, PASSWORD);
        peer.peer.send_json(&json!({"room_id": room_id}));

        match peer.next_frame().await {
            Some(ServerFrame::Joined { members, .. }) => (peer, members),
            other => panic!("{username} expected joined frame, got {other:?}"),
        }
    }

    pub fn say(&self, text: &str) {
        assert!(self.peer.send(text), "server side is gone");
    }

    /// Next frame, or `None` if the server closed. Panics on timeout.
    pub async fn next_frame(&mut self) -> Option<ServerFrame> {
        timeout(DEFAULT_TIMEOUT, self.peer.recv_frame())
            .await
            .expect("timed out waiting for a frame")
    }

    /// Next chat message as `(sender, text, seq)`, skipping presence notices.
    pub async fn next_message(&mut self) -> (String, String, u64) {
        loop {
            match self.next_frame().await {
                Some(ServerFrame::Message {
                    sender, text, seq, ..
                }) => return (sender, text, seq),
                Some(ServerFrame::MemberJoined { .. }) | Some(ServerFrame::MemberLeft { .. }) => {}
                other => panic!("expected a message, got {other:?}"),
            }
        }
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        if let Ok(frame) = timeout(QUIET_PERIOD, self.peer.recv()).await {
            panic!("expected silence, got {frame:?}");
        }
    }

    /// Close the client side and wait for the session to finish.
    pub async fn disconnect(mut self) -> Result<(), SessionError> {
        self.peer.close();
        timeout(DEFAULT_TIMEOUT, self.session)
            .await
            .expect("session did not end")
            .expect("session task panicked")
    }
}

/// Poll until `room_id` has `expected` members.
pub async fn wait_for_members(registry: &RoomRegistry, room_id: &str, expected: usize) {
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    loop {
        let count = match registry.get(room_id) {
            Some(room) => room.member_count().await,
            None => 0,
        };
        if count == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "room {room_id} has {count} members, expected {expected}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A running server on an ephemeral port with its own database.
pub struct TestServer {
    pub addr: SocketAddr,
    pub db: Database,
    pub chat: ChatService,
    _dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("huddle.db")).await.unwrap();

        let state = build_state(&config, db.clone());
        let chat = state.chat.clone();
        let server = WebServer::bind_with_state("127.0.0.1:0", state)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        Self {
            addr,
            db,
            chat,
            _dir: dir,
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Register an account with [`PASSWORD`].
    pub async fn add_user(&self, username: &str) {
        huddle::register(&self.db, username, PASSWORD).await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

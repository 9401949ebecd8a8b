//! HTTP API driven through the bundled client.

mod common;

use huddle::client::{ApiClient, ChatClient, ClientError};
use huddle::web::handlers::RoomResponse;
use huddle::Config;

use common::{wait_for_members, TestServer, PASSWORD};

fn api(server: &TestServer) -> ApiClient {
    ApiClient::new(&format!("http://{}", server.addr)).unwrap()
}

fn room(room_id: &str, member_count: usize) -> RoomResponse {
    RoomResponse {
        room_id: room_id.to_string(),
        member_count,
    }
}

#[tokio::test]
async fn test_register_over_http() {
    let server = TestServer::start(Config::default()).await;
    let api = api(&server);

    let account = api.register("alice", PASSWORD).await.unwrap();
    assert_eq!(account.username, "alice");

    match api.register("alice", PASSWORD).await {
        Err(ClientError::Api { status, detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail, "this username is already taken");
        }
        other => panic!("duplicate registration was not refused: {:?}", other.map(|a| a.id)),
    }
}

#[tokio::test]
async fn test_create_room_requires_valid_account() {
    let server = TestServer::start(Config::default()).await;
    server.add_user("alice").await;
    let api = api(&server);

    match api.create_room("alice", "wrong-password", "lobby").await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(api.list_rooms().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recorded_rooms_listed_before_anyone_joins() {
    let mut config = Config::default();
    config.chat.require_registered_rooms = true;
    let server = TestServer::start(config).await;
    server.add_user("alice").await;
    let api = api(&server);

    assert_eq!(
        api.create_room("alice", PASSWORD, "lobby").await.unwrap(),
        room("lobby", 0)
    );
    api.create_room("alice", PASSWORD, "attic").await.unwrap();
    assert!(matches!(
        api.create_room("alice", PASSWORD, "lobby").await,
        Err(ClientError::Api { status: 409, .. })
    ));

    assert_eq!(
        api.list_rooms().await.unwrap(),
        vec![room("attic", 0), room("lobby", 0)]
    );

    let client = ChatClient::connect(&server.ws_url(), "alice", PASSWORD, "lobby")
        .await
        .unwrap();
    assert_eq!(
        api.list_rooms().await.unwrap(),
        vec![room("attic", 0), room("lobby", 1)]
    );

    client.close().await.unwrap();
    wait_for_members(server.chat.registry(), "lobby", 0).await;
    assert_eq!(
        api.list_rooms().await.unwrap(),
        vec![room("attic", 0), room("lobby", 0)]
    );
}

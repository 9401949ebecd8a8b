//! HTTP API client.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ClientError;
use crate::web::error::ErrorBody;
use crate::web::handlers::{AccountResponse, CreateRoomRequest, RegisterRequest, RoomResponse};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total request timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("huddle/", env!("CARGO_PKG_VERSION"));

/// Client for the `/v1` HTTP API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url`, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// Register an account.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountResponse, ClientError> {
        let request = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .post(self.url("/register"))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// Record a room, authenticating as `username`.
    pub async fn create_room(
        &self,
        username: &str,
        password: &str,
        room_id: &str,
    ) -> Result<RoomResponse, ClientError> {
        let request = CreateRoomRequest {
            room_id: room_id.to_string(),
        };
        let response = self
            .client
            .post(self.url("/rooms"))
            .basic_auth(username, Some(password))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// List recorded and live rooms.
    pub async fn list_rooms(&self) -> Result<Vec<RoomResponse>, ClientError> {
        let response = self.client.get(self.url("/rooms")).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(e) => {
            debug!("Unreadable error body: {}", e);
            status.to_string()
        }
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        detail,
    })
}

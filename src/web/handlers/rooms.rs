//! Room handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::chat::validate_room_id;
use crate::db::{RoomRepository, UserRepository};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// A room and how many sessions are in it right now.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomResponse {
    pub room_id: String,
    pub member_count: usize,
}

/// Room creation request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub room_id: String,
}

/// List recorded and live rooms, ordered by id.
///
/// GET /v1/rooms
///
/// Recorded rooms nobody is in are listed with a member count of 0.
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomResponse>>, ApiError> {
    let mut rooms: BTreeMap<String, usize> = RoomRepository::new(state.db.pool())
        .list()
        .await?
        .into_iter()
        .map(|record| (record.room_id, 0))
        .collect();
    for live in state.chat.registry().list_rooms().await {
        rooms.insert(live.room_id, live.member_count);
    }

    Ok(Json(
        rooms
            .into_iter()
            .map(|(room_id, member_count)| RoomResponse {
                room_id,
                member_count,
            })
            .collect(),
    ))
}

/// Record a room.
///
/// POST /v1/rooms (Basic auth)
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let room_id = validate_room_id(&req.room_id).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let creator = UserRepository::new(state.db.pool())
        .get_by_username(&user.username)
        .await?
        .map(|u| u.id);
    if !RoomRepository::new(state.db.pool())
        .create(room_id, creator)
        .await?
    {
        return Err(ApiError::conflict(format!("room {room_id} already exists")));
    }
    info!("{} created room {}", user.username, room_id);

    let member_count = match state.chat.registry().get(room_id) {
        Some(room) => room.member_count().await,
        None => 0,
    };
    Ok((
        StatusCode::CREATED,
        Json(RoomResponse {
            room_id: room_id.to_string(),
            member_count,
        }),
    ))
}

//! Room existence records consulted before a session joins.

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::JoinError;
use crate::db::RoomRepository;
use crate::Database;

/// Decides whether a room may be joined, recording it if needed.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn ensure_room(&self, room_id: &str) -> Result<(), JoinError>;
}

/// Rooms exist only while they have members. Every id is joinable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralRooms;

#[async_trait]
impl RoomStore for EphemeralRooms {
    async fn ensure_room(&self, _room_id: &str) -> Result<(), JoinError> {
        Ok(())
    }
}

/// Room records kept in the `rooms` table.
///
/// With `require_existing` set only rooms created beforehand can be joined;
/// otherwise the first join records the room.
#[derive(Clone)]
pub struct DbRoomStore {
    db: Database,
    require_existing: bool,
}

impl DbRoomStore {
    pub fn new(db: Database, require_existing: bool) -> Self {
        Self {
            db,
            require_existing,
        }
    }
}

#[async_trait]
impl RoomStore for DbRoomStore {
    async fn ensure_room(&self, room_id: &str) -> Result<(), JoinError> {
        let repo = RoomRepository::new(self.db.pool());
        let outcome = if self.require_existing {
            repo.exists(room_id).await.map(|found| {
                if found {
                    Ok(())
                } else {
                    Err(JoinError::UnknownRoom(room_id.to_string()))
                }
            })
        } else {
            repo.create(room_id, None).await.map(|created| {
                if created {
                    info!("Recorded room {}", room_id);
                }
                Ok(())
            })
        };

        outcome.unwrap_or_else(|e| {
            warn!("Room store unavailable: {}", e);
            Err(JoinError::Unavailable(e.to_string()))
        })
    }
}

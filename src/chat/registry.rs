//! Room registry.
//!
//! Maps room ids to live rooms. Lookups and removals are serialised per
//! entry by the sharded map, so rooms with different ids never contend.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::error::JoinError;
use super::room::Room;

/// Maximum length of a room id, in characters.
pub const MAX_ROOM_ID_LENGTH: usize = 64;

/// Normalize a client-supplied room id.
pub fn validate_room_id(room_id: &str) -> Result<&str, JoinError> {
    let trimmed = room_id.trim();
    if trimmed.is_empty() {
        return Err(JoinError::EmptyRoomId);
    }
    if trimmed.chars().count() > MAX_ROOM_ID_LENGTH {
        return Err(JoinError::RoomIdTooLong);
    }
    Ok(trimmed)
}

/// Room listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: String,
    pub member_count: usize,
}

/// Registry of live rooms.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Room>>,
    presence: bool,
    this: Weak<RoomRegistry>,
}

impl RoomRegistry {
    /// Create a registry whose rooms announce joins and leaves.
    pub fn new() -> Arc<Self> {
        Self::with_presence(true)
    }

    pub fn with_presence(presence: bool) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            rooms: DashMap::new(),
            presence,
            this: this.clone(),
        })
    }

    /// Get the live room for `room_id`, creating it if there is none.
    ///
    /// Concurrent callers for the same id get the same instance. A room that
    /// closed but has not been removed yet is replaced.
    pub fn resolve_or_create(&self, room_id: &str) -> Arc<Room> {
        match self.rooms.entry(room_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_closed() {
                    return Arc::clone(entry.get());
                }
                let room = self.new_room(room_id);
                entry.insert(Arc::clone(&room));
                room
            }
            Entry::Vacant(entry) => {
                let room = self.new_room(room_id);
                entry.insert(Arc::clone(&room));
                room
            }
        }
    }

    fn new_room(&self, room_id: &str) -> Arc<Room> {
        debug!("Creating room {}", room_id);
        Arc::new(Room::new(room_id, self.presence, self.this.clone()))
    }

    /// Get a live room without creating it.
    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms
            .get(room_id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|room| !room.is_closed())
    }

    /// Remove `room` from the registry if it is still the registered
    /// instance for `room_id` and has closed.
    ///
    /// Called by the room itself once its last member leaves.
    pub fn remove_if_empty(&self, room_id: &str, room: &Room) -> bool {
        let removed = self
            .rooms
            .remove_if(room_id, |_, current| {
                std::ptr::eq(Arc::as_ptr(current), room) && current.is_closed()
            })
            .is_some();
        if removed {
            debug!("Removed empty room {}", room_id);
        }
        removed
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// List live rooms with their member counts, ordered by id.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms: Vec<Arc<Room>> = self
            .rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            if room.is_closed() {
                continue;
            }
            summaries.push(RoomSummary {
                room_id: room.id().to_string(),
                member_count: room.member_count().await,
            });
        }
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }
}

//! Chat module for Huddle.
//!
//! This module provides the real-time chat engine:
//! - Connections split into frame sources and sinks
//! - Sessions (authenticate, join, relay, teardown)
//! - The room registry and rooms with ordered broadcast
//! - Room existence records

pub mod connection;
pub mod error;
pub mod protocol;
mod registry;
mod room;
mod session;
mod store;

pub use connection::{memory_pair, Connection, FrameSink, FrameSource, MemoryConnection, MemoryPeer};
pub use error::{JoinError, SessionError, TransportError};
pub use protocol::{codes, Credentials, JoinRequest, ServerFrame};
pub use registry::{validate_room_id, RoomRegistry, RoomSummary, MAX_ROOM_ID_LENGTH};
pub use room::{
    ChatMessage, Member, MemberInfo, Outbound, Room, RoomEvent, RoomMembership, SessionId,
};
pub use session::{ChatService, SessionSettings};
pub use store::{DbRoomStore, EphemeralRooms, RoomStore};

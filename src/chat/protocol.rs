//! Wire frames exchanged with chat clients.

use serde::{Deserialize, Serialize};

use super::room::RoomEvent;

/// Error codes carried by [`ServerFrame::Error`].
pub mod codes {
    /// Credentials missing, malformed or rejected.
    pub const AUTH_FAILED: &str = "auth_failed";
    /// The room could not be joined.
    pub const JOIN_FAILED: &str = "join_failed";
}

/// First frame sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Second frame sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Room to join.
    pub room_id: String,
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The session joined a room.
    Joined {
        /// Room ID.
        room_id: String,
        /// Usernames of all current members, including the joiner.
        members: Vec<String>,
    },
    /// Chat message from another member.
    Message {
        /// Sender's username.
        sender: String,
        /// Message text.
        text: String,
        /// Room ID.
        room_id: String,
        /// Per-room sequence number.
        seq: u64,
        /// RFC 3339 receipt timestamp.
        timestamp: String,
    },
    /// Another member joined.
    MemberJoined {
        /// Room ID.
        room_id: String,
        /// Display name.
        username: String,
    },
    /// Another member left.
    MemberLeft {
        /// Room ID.
        room_id: String,
        /// Display name.
        username: String,
    },
    /// Terminal error; the server closes the connection after sending it.
    Error {
        /// Error code, see [`codes`].
        code: String,
        /// Human readable reason.
        reason: String,
    },
}

impl ServerFrame {
    /// Create an error frame.
    pub fn error(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&RoomEvent> for ServerFrame {
    fn from(event: &RoomEvent) -> Self {
        match event {
            RoomEvent::Message(msg) => Self::Message {
                sender: msg.sender.clone(),
                text: msg.text.clone(),
                room_id: msg.room_id.clone(),
                seq: msg.seq,
                timestamp: msg.timestamp.to_rfc3339(),
            },
            RoomEvent::MemberJoined { room_id, username } => Self::MemberJoined {
                room_id: room_id.clone(),
                username: username.clone(),
            },
            RoomEvent::MemberLeft { room_id, username } => Self::MemberLeft {
                room_id: room_id.clone(),
                username: username.clone(),
            },
        }
    }
}

//! Error kinds of the chat engine.
//!
//! All of them are scoped to a single session; none of them ever reaches
//! another session or a room's shared state.

use thiserror::Error;

use super::registry::MAX_ROOM_ID_LENGTH;

/// Failure of the underlying transport of one connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is already closed.
    #[error("connection closed")]
    Closed,

    /// The transport reported an I/O or protocol failure.
    #[error("transport failure: {0}")]
    Io(String),
}

/// Why a session could not become a member of a room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The client did not send a room id in time.
    #[error("timed out waiting for a room id")]
    Timeout,

    #[error("malformed join request")]
    MalformedRequest,

    #[error("room id must not be empty")]
    EmptyRoomId,

    #[error("room id must be at most {MAX_ROOM_ID_LENGTH} characters")]
    RoomIdTooLong,

    #[error("room {0} does not exist")]
    UnknownRoom(String),

    /// The room directory could not be consulted.
    #[error("room directory unavailable: {0}")]
    Unavailable(String),

    /// The room was torn down between lookup and registration.
    ///
    /// Retried internally; only surfaced if the retry loses the race too.
    #[error("room was closed while joining")]
    RoomClosed,
}

/// Terminal outcome of a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad or missing credentials. No session state was created.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The room could not be joined.
    #[error("join failed: {0}")]
    Join(#[from] JoinError),

    /// The connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

//! Huddle - ad-hoc chat rooms over WebSockets.
//!
//! Authenticated clients join named rooms and every message sent to a room
//! is fanned out to its other members in one per-room order.

pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, register, validate_password, verify_password, AccountVerifier,
    DbAccountVerifier, MemoryAccounts, PasswordError, RegistrationError, Verification,
};
pub use chat::{ChatService, RoomRegistry, SessionError};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{HuddleError, Result};

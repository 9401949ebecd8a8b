//! WebSocket module for real-time chat.

pub mod chat;

pub use chat::{chat_ws_handler, WsConnection};

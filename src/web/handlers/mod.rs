//! API handlers.

pub mod account;
pub mod rooms;

pub use account::*;
pub use rooms::*;

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::chat::ChatService;
use crate::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Account and room records.
    pub db: Database,
    /// Chat engine every WebSocket session is served by.
    pub chat: ChatService,
    /// One permit per live chat connection.
    pub connections: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: Database, chat: ChatService, max_connections: usize) -> Self {
        Self {
            db,
            chat,
            connections: Arc::new(Semaphore::new(max_connections)),
        }
    }
}

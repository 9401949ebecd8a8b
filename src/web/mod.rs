//! Web module for Huddle.
//!
//! This module provides the HTTP API (account registration, room listing,
//! health) and the WebSocket endpoint chat clients connect to.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::{build_state, WebServer};

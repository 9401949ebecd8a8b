//! Web server for Huddle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::AppState;
use super::router::create_router;
use crate::auth::DbAccountVerifier;
use crate::chat::{ChatService, DbRoomStore, RoomRegistry, SessionSettings};
use crate::{Config, Database, Result};

/// Build the application state for a configured server.
pub fn build_state(config: &Config, db: Database) -> AppState {
    let chat = ChatService::new(
        RoomRegistry::with_presence(config.chat.presence_notifications),
        Arc::new(DbAccountVerifier::new(db.clone())),
        Arc::new(DbRoomStore::new(
            db.clone(),
            config.chat.require_registered_rooms,
        )),
        SessionSettings::from_config(config),
    );
    AppState::new(db, chat, config.server.max_connections)
}

/// HTTP and WebSocket server.
pub struct WebServer {
    listener: TcpListener,
    router: Router,
}

impl WebServer {
    /// Bind to `host:port` from the config.
    pub async fn bind(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        Self::bind_with_state(&addr, build_state(config, db)).await
    }

    /// Bind to `addr` serving the given state.
    pub async fn bind_with_state(addr: &str, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Huddle listening on http://{}", local_addr);

        Ok(Self {
            listener,
            router: create_router(Arc::new(state)),
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Huddle stopped");
        Ok(())
    }
}

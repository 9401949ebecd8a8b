//! Chat WebSocket handler.
//!
//! Adapts an axum [`WebSocket`] to the chat engine's [`Connection`] and
//! hands each upgraded socket to the shared [`ChatService`](crate::chat::ChatService).

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::chat::{Connection, FrameSink, FrameSource, TransportError};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// A WebSocket carrying chat frames.
pub struct WsConnection {
    socket: WebSocket,
}

impl WsConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

/// Sending half of a [`WsConnection`].
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
    closed: bool,
}

/// Receiving half of a [`WsConnection`].
pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

impl Connection for WsConnection {
    type Sink = WsSink;
    type Source = WsSource;

    fn split(self) -> (WsSink, WsSource) {
        let (sender, receiver) = self.socket.split();
        (
            WsSink {
                inner: sender,
                closed: false,
            },
            WsSource { inner: receiver },
        )
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(msg) = self.inner.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(Some(text.to_string())),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(Message::Binary(_)) => debug!("Ignoring binary frame"),
                // Ping/Pong are answered by axum.
                Ok(_) => {}
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inner
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.inner.close().await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}

/// WebSocket chat handler.
///
/// GET /ws
///
/// The first two frames carry the credentials and the room id; see
/// [`crate::chat::protocol`]. Refused with 503 once `max_connections`
/// sessions are live.
pub async fn chat_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let permit = match Arc::clone(&state.connections).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!("Connection limit reached, refusing chat connection");
            return ApiError::unavailable("too many connections").into_response();
        }
    };

    info!("Chat connection accepted");
    let chat = state.chat.clone();
    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        if let Err(e) = chat.serve(WsConnection::new(socket)).await {
            debug!("Chat session ended: {}", e);
        }
    })
}

//! Clients for a running server.
//!
//! [`ChatClient`] speaks the WebSocket chat protocol used by `join`;
//! [`ApiClient`] wraps the HTTP API used by `register`, `create` and `rooms`.

mod api;

pub use api::ApiClient;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::chat::{Credentials, JoinRequest, ServerFrame};

/// Client-side errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP API answered with an error status.
    #[error("{detail} (HTTP {status})")]
    Api { status: u16, detail: String },

    /// The server refused the connection with an error frame.
    #[error("{code}: {reason}")]
    Rejected { code: String, reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A joined chat connection.
pub struct ChatClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    room_id: String,
    members: Vec<String>,
}

impl ChatClient {
    /// Connect, authenticate and join `room_id`.
    pub async fn connect(
        url: &str,
        username: &str,
        password: &str,
        room_id: &str,
    ) -> Result<Self, ClientError> {
        let (mut ws, _) = connect_async(url).await?;
        debug!("Connected to {}", url);

        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let join = JoinRequest {
            room_id: room_id.to_string(),
        };
        ws.send(Message::text(encode(&credentials)?)).await?;
        ws.send(Message::text(encode(&join)?)).await?;

        let mut client = Self {
            ws,
            room_id: String::new(),
            members: Vec::new(),
        };
        match client.next_frame().await? {
            Some(ServerFrame::Joined { room_id, members }) => {
                client.room_id = room_id;
                client.members = members;
                Ok(client)
            }
            Some(ServerFrame::Error { code, reason }) => Err(ClientError::Rejected { code, reason }),
            Some(other) => Err(ClientError::Protocol(format!("unexpected frame {other:?}"))),
            None => Err(ClientError::Closed),
        }
    }

    /// Room the server placed this client in.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Members present when the client joined, the client included.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Send a chat line.
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        self.ws.send(Message::text(text)).await?;
        Ok(())
    }

    /// Wait for the next server frame. `None` once the server closed.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>, ClientError> {
        next_frame(&mut self.ws).await
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        Ok(())
    }

    /// Relay stdin lines to the room and print incoming frames until either
    /// side closes.
    pub async fn run_interactive(self) -> Result<(), ClientError> {
        let (mut tx, mut rx) = self.ws.split();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => tx.send(Message::text(line)).await?,
                    None => {
                        tx.close().await?;
                        break;
                    }
                },
                frame = next_frame(&mut rx) => match frame? {
                    Some(frame) => {
                        if let Some(line) = format_frame(&frame) {
                            println!("{line}");
                        }
                    }
                    None => {
                        println!("Connection closed by server");
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|e| ClientError::Protocol(e.to_string()))
}

async fn next_frame<S>(stream: &mut S) -> Result<Option<ServerFrame>, ClientError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => {
                let frame = serde_json::from_str(&text)
                    .map_err(|e| ClientError::Protocol(format!("bad frame: {e}")))?;
                return Ok(Some(frame));
            }
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

/// Render a frame for the terminal.
pub fn format_frame(frame: &ServerFrame) -> Option<String> {
    match frame {
        ServerFrame::Message {
            sender,
            text,
            timestamp,
            ..
        } => Some(format!("[{}] {}: {}", display_time(timestamp), sender, text)),
        ServerFrame::MemberJoined { username, .. } => Some(format!("* {username} joined")),
        ServerFrame::MemberLeft { username, .. } => Some(format!("* {username} left")),
        ServerFrame::Error { code, reason } => Some(format!("! {code}: {reason}")),
        ServerFrame::Joined { .. } => None,
    }
}

fn display_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

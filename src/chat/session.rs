//! Chat session lifecycle.
//!
//! A session drives one connection through authentication, joining a room,
//! relaying frames into the room and teardown. Inbound frames are read by
//! the session task itself; outbound room events are written by a separate
//! writer task fed by the member's bounded queue, so a slow peer never
//! stalls its own receive loop or anyone else's broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::connection::{Connection, FrameSink, FrameSource};
use super::error::{JoinError, SessionError, TransportError};
use super::protocol::{codes, Credentials, JoinRequest, ServerFrame};
use super::registry::{validate_room_id, RoomRegistry};
use super::room::{Member, Outbound, RoomEvent, RoomMembership, SessionId};
use super::store::RoomStore;
use crate::auth::{AccountVerifier, Verification};
use crate::Config;

/// Resolution attempts before a join that keeps racing room teardown fails.
const JOIN_ATTEMPTS: usize = 2;

/// How long teardown waits for the writer to flush queued frames.
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Longest handshake allowed, whatever the settings say.
const MAX_HANDSHAKE: Duration = Duration::from_secs(crate::config::MAX_AUTH_TIMEOUT_SECS);

/// Per-session limits.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Time allowed for sending credentials and the room id.
    pub auth_timeout: Duration,
    /// Capacity of each member's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(30),
            outbound_queue_capacity: 256,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth_timeout: Duration::from_secs(config.server.auth_timeout_secs),
            outbound_queue_capacity: config.chat.outbound_queue_capacity,
        }
    }
}

/// Shared state every session is served with.
#[derive(Clone)]
pub struct ChatService {
    registry: Arc<RoomRegistry>,
    verifier: Arc<dyn AccountVerifier>,
    rooms: Arc<dyn RoomStore>,
    settings: SessionSettings,
}

impl ChatService {
    pub fn new(
        registry: Arc<RoomRegistry>,
        verifier: Arc<dyn AccountVerifier>,
        rooms: Arc<dyn RoomStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            registry,
            verifier,
            rooms,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Accounts sessions are authenticated against.
    pub fn verifier(&self) -> &Arc<dyn AccountVerifier> {
        &self.verifier
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Serve one connection until it closes.
    ///
    /// Returns `Ok(())` when the session ends normally (peer closed, or the
    /// session was evicted from its room). Authentication and join failures
    /// are reported to the peer with an error frame before the connection
    /// is closed.
    pub async fn serve<C: Connection>(&self, connection: C) -> Result<(), SessionError> {
        let (mut sink, mut source) = connection.split();
        let deadline = Instant::now() + self.settings.auth_timeout.min(MAX_HANDSHAKE);

        let username = match self.authenticate(&mut source, deadline).await {
            Ok(username) => username,
            Err(e) => {
                warn!("Rejected connection: {}", e);
                reject(&mut sink, codes::AUTH_FAILED, &e).await;
                return Err(e);
            }
        };

        let session_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.settings.outbound_queue_capacity);
        let joined = self
            .join(&mut source, deadline, session_id, &username, outbound_tx)
            .await;
        let (membership, members) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                warn!("{} could not join: {}", username, e);
                reject(&mut sink, codes::JOIN_FAILED, &e).await;
                return Err(e);
            }
        };

        let session = Session {
            id: session_id,
            username,
            membership,
        };
        session.run(sink, source, outbound_rx, members).await
    }

    async fn authenticate<S: FrameSource>(
        &self,
        source: &mut S,
        deadline: Instant,
    ) -> Result<String, SessionError> {
        let frame = match timeout_at(deadline, source.receive()).await {
            Ok(received) => received?.ok_or(TransportError::Closed)?,
            Err(_) => {
                return Err(SessionError::Auth(
                    "timed out waiting for credentials".to_string(),
                ))
            }
        };
        let credentials: Credentials = serde_json::from_str(&frame)
            .map_err(|_| SessionError::Auth("malformed credentials".to_string()))?;

        match self
            .verifier
            .verify(&credentials.username, &credentials.password)
            .await
        {
            Ok(Verification::Valid { username }) => {
                debug!("{} authenticated", username);
                Ok(username)
            }
            Ok(Verification::Invalid) => Err(SessionError::Auth(
                "invalid username or password".to_string(),
            )),
            Err(e) => {
                error!("Account verifier failed: {}", e);
                Err(SessionError::Auth("account service unavailable".to_string()))
            }
        }
    }

    async fn join<S: FrameSource>(
        &self,
        source: &mut S,
        deadline: Instant,
        session_id: SessionId,
        username: &str,
        outbound: Outbound,
    ) -> Result<(RoomMembership, Vec<String>), SessionError> {
        let frame = match timeout_at(deadline, source.receive()).await {
            Ok(received) => received?.ok_or(TransportError::Closed)?,
            Err(_) => return Err(JoinError::Timeout.into()),
        };
        let request: JoinRequest =
            serde_json::from_str(&frame).map_err(|_| JoinError::MalformedRequest)?;
        let room_id = validate_room_id(&request.room_id)?;
        self.rooms.ensure_room(room_id).await?;

        for attempt in 1..=JOIN_ATTEMPTS {
            let room = self.registry.resolve_or_create(room_id);
            let member = Member::new(session_id, username, outbound.clone());
            match room.join(member).await {
                Ok(joined) => return Ok(joined),
                Err(JoinError::RoomClosed) => {
                    debug!("Room {} closed during join (attempt {})", room_id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(JoinError::RoomClosed.into())
    }
}

/// An authenticated session that is a member of a room.
struct Session {
    id: SessionId,
    username: String,
    membership: RoomMembership,
}

impl Session {
    async fn run<K: FrameSink, S: FrameSource>(
        self,
        mut sink: K,
        mut source: S,
        outbound: mpsc::Receiver<Arc<RoomEvent>>,
        members: Vec<String>,
    ) -> Result<(), SessionError> {
        let Session {
            id,
            username,
            membership,
        } = self;
        let room_id = membership.room().id().to_string();

        let joined = ServerFrame::Joined {
            room_id: room_id.clone(),
            members,
        };
        if let Err(e) = send_frame(&mut sink, &joined).await {
            membership.leave().await;
            sink.close().await;
            return Err(e.into());
        }
        info!("Session {} started for {} in room {}", id, username, room_id);

        let mut writer = tokio::spawn(write_outbound(sink, outbound));
        let mut writer_done = false;
        let result = tokio::select! {
            received = receive_loop(&mut source, &membership) => received,
            written = &mut writer => {
                writer_done = true;
                match written {
                    Ok(Ok(())) => {
                        debug!("Session {} evicted from room {}", id, room_id);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(TransportError::Io(e.to_string()).into()),
                }
            }
        };

        // Leaving drops the room's end of the outbound queue, which lets the
        // writer drain what is left and close the sink.
        membership.leave().await;
        if !writer_done && timeout(WRITER_GRACE, &mut writer).await.is_err() {
            warn!("Writer for session {} did not finish, aborting", id);
            writer.abort();
        }
        drop(source);

        match &result {
            Ok(()) => info!("Session {} for {} ended", id, username),
            Err(e) => info!("Session {} for {} ended: {}", id, username, e),
        }
        result
    }
}

async fn receive_loop<S: FrameSource>(
    source: &mut S,
    membership: &RoomMembership,
) -> Result<(), SessionError> {
    loop {
        match source.receive().await? {
            Some(text) if text.trim().is_empty() => continue,
            Some(text) => {
                membership.broadcast(text).await;
            }
            None => return Ok(()),
        }
    }
}

async fn write_outbound<K: FrameSink>(
    mut sink: K,
    mut outbound: mpsc::Receiver<Arc<RoomEvent>>,
) -> Result<(), TransportError> {
    while let Some(event) = outbound.recv().await {
        if let Err(e) = send_frame(&mut sink, &ServerFrame::from(event.as_ref())).await {
            sink.close().await;
            return Err(e);
        }
    }
    sink.close().await;
    Ok(())
}

async fn send_frame<K: FrameSink>(sink: &mut K, frame: &ServerFrame) -> Result<(), TransportError> {
    let payload = frame
        .to_json()
        .map_err(|e| TransportError::Io(e.to_string()))?;
    sink.send(payload).await
}

/// Send a terminal error frame and close.
async fn reject<K: FrameSink>(sink: &mut K, code: &str, err: &SessionError) {
    let reason = match err {
        SessionError::Auth(reason) => reason.clone(),
        SessionError::Join(e) => e.to_string(),
        SessionError::Transport(e) => e.to_string(),
    };
    if let Err(e) = send_frame(sink, &ServerFrame::error(code, reason)).await {
        debug!("Could not deliver {} frame: {}", code, e);
    }
    sink.close().await;
}

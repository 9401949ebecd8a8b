//! Chat room implementation for Huddle.
//!
//! A room owns its membership and is the single ordering point for
//! everything broadcast into it. Every mutation (join, leave, broadcast)
//! takes the room's lock, so all members observe messages in one order.
//! Delivery never blocks: each member has a bounded outbound queue that is
//! drained by its session's writer task, and a member whose queue is full
//! or closed is evicted on the spot.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::JoinError;
use super::registry::RoomRegistry;

/// Identity of one session within a room.
pub type SessionId = Uuid;

/// Queue feeding one member's outbound writer.
pub type Outbound = mpsc::Sender<Arc<RoomEvent>>;

/// A chat message as fanned out to room members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender's username.
    pub sender: String,
    /// Room the message was sent to.
    pub room_id: String,
    /// Message text.
    pub text: String,
    /// Position in the room's total order.
    pub seq: u64,
    /// Server receipt time.
    pub timestamp: DateTime<Utc>,
}

/// Something a room delivers to its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A chat message from another member.
    Message(ChatMessage),
    /// Someone joined the room.
    MemberJoined {
        /// Room that was joined.
        room_id: String,
        /// Username of the new member.
        username: String,
    },
    /// Someone left the room or was evicted from it.
    MemberLeft {
        /// Room that was left.
        room_id: String,
        /// Username of the departed member.
        username: String,
    },
}

/// A session registered with a room.
#[derive(Debug)]
pub struct Member {
    session_id: SessionId,
    username: String,
    outbound: Outbound,
    joined_at: DateTime<Utc>,
}

impl Member {
    /// Create a member that receives room events through `outbound`.
    pub fn new(session_id: SessionId, username: impl Into<String>, outbound: Outbound) -> Self {
        Self {
            session_id,
            username: username.into(),
            outbound,
            joined_at: Utc::now(),
        }
    }

    fn info(&self) -> MemberInfo {
        MemberInfo {
            session_id: self.session_id,
            username: self.username.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// Public view of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Session the member belongs to.
    pub session_id: SessionId,
    /// Canonical username of the account.
    pub username: String,
    /// When the member joined.
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Membership {
    members: HashMap<SessionId, Member>,
    next_seq: u64,
    closed: bool,
}

impl Membership {
    fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.values().map(|m| m.username.clone()).collect();
        names.sort();
        names
    }
}

/// A chat room.
pub struct Room {
    id: String,
    created_at: DateTime<Utc>,
    presence: bool,
    state: Mutex<Membership>,
    /// Mirrors `Membership::closed` for lock-free reads by the registry.
    closed: AtomicBool,
    registry: Weak<RoomRegistry>,
}

impl Room {
    pub(crate) fn new(id: impl Into<String>, presence: bool, registry: Weak<RoomRegistry>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            presence,
            state: Mutex::new(Membership::default()),
            closed: AtomicBool::new(false),
            registry,
        }
    }

    /// Get the room ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the room emptied and was torn down. A closed room never reopens.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register a member.
    ///
    /// Returns the membership guard and the sorted usernames of all members,
    /// the joiner included. Fails with [`JoinError::RoomClosed`] if the room
    /// was torn down after it was resolved.
    pub async fn join(
        self: &Arc<Self>,
        member: Member,
    ) -> Result<(RoomMembership, Vec<String>), JoinError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(JoinError::RoomClosed);
        }

        let session_id = member.session_id;
        let username = member.username.clone();
        state.members.insert(session_id, member);

        if self.presence {
            let notice = RoomEvent::MemberJoined {
                room_id: self.id.clone(),
                username: username.clone(),
            };
            self.dispatch(&mut state, Some(session_id), notice);
        }

        info!(
            "{} joined room {} ({} members)",
            username,
            self.id,
            state.members.len()
        );
        let members = state.usernames();
        Ok((RoomMembership::new(Arc::clone(self), session_id), members))
    }

    /// Remove a member. Returns false if it was not a member.
    ///
    /// When the last member leaves the room closes and unregisters itself.
    pub async fn leave(&self, session_id: SessionId) -> bool {
        let mut state = self.state.lock().await;
        let Some(member) = state.members.remove(&session_id) else {
            return false;
        };

        info!("{} left room {}", member.username, self.id);
        if self.presence {
            let notice = RoomEvent::MemberLeft {
                room_id: self.id.clone(),
                username: member.username,
            };
            self.dispatch(&mut state, None, notice);
        }
        self.close_if_empty(&mut state);
        true
    }

    /// Broadcast text from a member to every other member.
    ///
    /// Returns the number of members the message was queued for. Text from a
    /// session that is no longer a member is dropped.
    pub async fn broadcast(&self, sender: SessionId, text: impl Into<String>) -> usize {
        let mut state = self.state.lock().await;
        let Some(username) = state.members.get(&sender).map(|m| m.username.clone()) else {
            debug!("Dropping message from non-member {} in room {}", sender, self.id);
            return 0;
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        let message = ChatMessage {
            sender: username,
            room_id: self.id.clone(),
            text: text.into(),
            seq,
            timestamp: Utc::now(),
        };
        self.dispatch(&mut state, Some(sender), RoomEvent::Message(message))
    }

    /// Get the number of members.
    pub async fn member_count(&self) -> usize {
        self.state.lock().await.members.len()
    }

    /// Snapshot of the current members, ordered by username.
    pub async fn members(&self) -> Vec<MemberInfo> {
        let state = self.state.lock().await;
        let mut members: Vec<MemberInfo> = state.members.values().map(Member::info).collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        members
    }

    pub async fn is_member(&self, session_id: SessionId) -> bool {
        self.state.lock().await.members.contains_key(&session_id)
    }

    /// Queue an event for every member except `exclude`.
    ///
    /// Members that cannot take the event are evicted; their departure is
    /// announced in turn when presence notices are on. Returns how many
    /// members the original event was queued for.
    fn dispatch(&self, state: &mut Membership, exclude: Option<SessionId>, event: RoomEvent) -> usize {
        let mut pending = VecDeque::from([(exclude, Arc::new(event))]);
        let mut delivered = None;

        while let Some((exclude, event)) = pending.pop_front() {
            let mut queued = 0;
            let mut evicted = Vec::new();

            for (session_id, member) in &state.members {
                if Some(*session_id) == exclude {
                    continue;
                }
                match member.outbound.try_send(Arc::clone(&event)) {
                    Ok(()) => queued += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            "Evicting {} from room {}: outbound queue full",
                            member.username, self.id
                        );
                        evicted.push(*session_id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Evicting {} from room {}: session gone", member.username, self.id);
                        evicted.push(*session_id);
                    }
                }
            }
            delivered.get_or_insert(queued);

            for session_id in evicted {
                if let Some(member) = state.members.remove(&session_id) {
                    if self.presence {
                        let notice = RoomEvent::MemberLeft {
                            room_id: self.id.clone(),
                            username: member.username,
                        };
                        pending.push_back((None, Arc::new(notice)));
                    }
                }
            }
        }

        delivered.unwrap_or(0)
    }

    fn close_if_empty(&self, state: &mut Membership) {
        if state.closed || !state.members.is_empty() {
            return;
        }
        state.closed = true;
        self.closed.store(true, Ordering::Release);

        if let Some(registry) = self.registry.upgrade() {
            registry.remove_if_empty(&self.id, self);
        }
        debug!("Room {} closed", self.id);
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A session's registration in a room.
///
/// [`RoomMembership::leave`] deregisters the session. If the guard is dropped
/// without leaving (the session task was cancelled) the leave is spawned onto
/// the current runtime instead, so a session is removed exactly once either way.
#[derive(Debug)]
pub struct RoomMembership {
    room: Arc<Room>,
    session_id: SessionId,
    active: bool,
}

impl RoomMembership {
    fn new(room: Arc<Room>, session_id: SessionId) -> Self {
        Self {
            room,
            session_id,
            active: true,
        }
    }

    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Broadcast text to the other members.
    pub async fn broadcast(&self, text: impl Into<String>) -> usize {
        self.room.broadcast(self.session_id, text).await
    }

    /// Deregister. Returns false if the room had already evicted the session.
    pub async fn leave(mut self) -> bool {
        let left = self.room.leave(self.session_id).await;
        self.active = false;
        left
    }
}

impl Drop for RoomMembership {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        let room = Arc::clone(&self.room);
        let session_id = self.session_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    room.leave(session_id).await;
                });
            }
            Err(_) => warn!(
                "Membership {} in room {} dropped outside a runtime",
                session_id,
                room.id()
            ),
        }
    }
}

//! Room actor: an isolated task that owns one gallery's live state.
//!
//! Each room runs in its own Tokio task and communicates with the outside
//! world through an mpsc channel. All state (registry, rate limiter, chat
//! log, per-session senders) lives inside the task, so every command is
//! handled as one run-to-completion step with no locking. In particular,
//! duplicate eviction and the replacing session's registration happen
//! within a single step, which is what keeps an evicted session from ever
//! appearing in a join snapshot.

use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use galerra_protocol::{
    ChatEntry, ClientEvent, JoinOptions, PlayerSnapshot, ServerEvent,
    SessionId, SignalKind,
};
use galerra_session::{Presence, SessionRegistry};
use tokio::sync::{mpsc, oneshot};

use crate::{RateChannel, RateLimiter, RoomConfig, RoomError, RoomPhase};
use crate::chat::ChatLog;

/// WebSocket close code sent to a session evicted in favor of a newer
/// connection with the same user or device identity.
pub const REPLACED_CLOSE_CODE: u16 = 4000;

/// Close reason accompanying [`REPLACED_CLOSE_CODE`].
pub const REPLACED_CLOSE_REASON: &str = "replaced by a newer session";

// ---------------------------------------------------------------------------
// Outbound messages
// ---------------------------------------------------------------------------

/// What a room pushes to a session's connection handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutbound {
    /// A wire event to forward to the client.
    Event(ServerEvent),

    /// This session was evicted by a newer session with the same
    /// identity. The handler should close the connection with
    /// [`REPLACED_CLOSE_CODE`] and stop.
    Replaced,
}

/// Channel sender for delivering outbound messages to one session.
///
/// Unbounded: the room never blocks on a slow client; the transport layer
/// is responsible for closing connections that cannot keep up.
pub type SessionSender = mpsc::UnboundedSender<RoomOutbound>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Admit a session. Evicts identity duplicates first.
    Join {
        session_id: SessionId,
        options: JoinOptions,
        sender: SessionSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a session. Replies with the remaining occupancy so the
    /// manager can dispose an emptied room.
    Leave {
        session_id: SessionId,
        reply: oneshot::Sender<usize>,
    },

    /// A wire event from a joined session.
    Event {
        session_id: SessionId,
        event: ClientEvent,
    },

    /// Request room metadata.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Stop accepting commands and release all state.
    Dispose,
}

/// A snapshot of room metadata (not the presence state itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_key: String,
    pub phase: RoomPhase,
    pub occupancy: usize,
    pub max_clients: usize,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone; the manager holds one
/// per room and each connection handler holds one for its room.
#[derive(Clone)]
pub struct RoomHandle {
    room_key: String,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The key this room was created under.
    pub fn room_key(&self) -> &str {
        &self.room_key
    }

    /// Requests admission for a session.
    pub async fn join(
        &self,
        session_id: SessionId,
        options: JoinOptions,
        sender: SessionSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                session_id,
                options,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))?
    }

    /// Removes a session and returns the remaining occupancy.
    pub async fn leave(
        &self,
        session_id: SessionId,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                session_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))
    }

    /// Forwards a wire event from a session (fire-and-forget).
    pub async fn send_event(
        &self,
        session_id: SessionId,
        event: ClientEvent,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Event { session_id, event })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))
    }

    /// Tells the room to dispose. Idempotent from the caller's side: a
    /// second dispose finds the channel closed and reports Unavailable,
    /// which callers ignore.
    pub async fn dispose(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Dispose)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_key.clone()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal room state. Runs inside a Tokio task.
struct RoomActor {
    room_key: String,
    phase: RoomPhase,
    config: RoomConfig,
    registry: SessionRegistry,
    /// Per-session outbound channels, kept alongside the registry.
    senders: HashMap<SessionId, SessionSender>,
    limiter: RateLimiter,
    chat: ChatLog,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the command loop until disposal.
    async fn run(mut self) {
        tracing::info!(room_key = %self.room_key, "room created");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    session_id,
                    options,
                    sender,
                    reply,
                } => {
                    let result =
                        self.handle_join(session_id, &options, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { session_id, reply } => {
                    self.handle_leave(session_id);
                    let _ = reply.send(self.registry.len());
                }
                RoomCommand::Event { session_id, event } => {
                    self.handle_event(session_id, event);
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Dispose => {
                    self.phase = RoomPhase::Disposing;
                    break;
                }
            }
        }

        // Dropping the actor drops the registry, limiter windows, chat
        // log, and every outbound sender in one go.
        tracing::info!(room_key = %self.room_key, "room disposed");
    }

    // -- Join / leave ------------------------------------------------------

    fn handle_join(
        &mut self,
        session_id: SessionId,
        options: &JoinOptions,
        sender: SessionSender,
    ) -> Result<(), RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::Disposing(self.room_key.clone()));
        }

        let presence = Presence::from_join(session_id, options);

        // Capacity is judged with duplicates discounted, so a full-room
        // refusal never costs the user their existing session.
        let duplicates = self.registry.find_by_identity(
            presence.user_id.as_deref(),
            presence.device_id.as_deref(),
        );
        if self.registry.len() - duplicates.len() >= self.config.max_clients
        {
            return Err(RoomError::RoomFull(self.room_key.clone()));
        }

        // Last-writer-wins: any prior session with the same user or
        // device identity goes away before the newcomer is registered.
        self.evict_replaced(&duplicates);

        self.registry.insert(session_id, presence);
        self.senders.insert(session_id, sender);

        // The snapshot is built after registration, so it reflects
        // exactly the occupants of this instant: duplicates already
        // evicted, the joiner itself excluded.
        let players: Vec<PlayerSnapshot> = self
            .registry
            .iter()
            .filter(|(sid, _)| *sid != session_id)
            .map(|(sid, presence)| presence.snapshot(sid))
            .collect();
        self.send_to(
            session_id,
            RoomOutbound::Event(ServerEvent::RoomState {
                room_key: self.room_key.clone(),
                players,
                chat: self.chat.entries(),
            }),
        );

        let joined = self
            .registry
            .get(session_id)
            .map(|presence| presence.snapshot(session_id));
        if let Some(player) = joined {
            self.broadcast_except(
                session_id,
                &ServerEvent::PlayerJoined { player },
            );
        }

        tracing::info!(
            room_key = %self.room_key,
            %session_id,
            occupancy = self.registry.len(),
            "session joined"
        );
        Ok(())
    }

    /// Evicts prior sessions that the incoming identity replaces. The
    /// eviction is a full leave (registry, limiter, sender) plus a close
    /// directive to the old connection; if that connection is already
    /// gone, the dead sender just swallows the directive.
    fn evict_replaced(&mut self, duplicates: &[SessionId]) {
        for &stale in duplicates {
            self.send_to(stale, RoomOutbound::Replaced);
            self.drop_session(stale);
            self.broadcast_except(
                stale,
                &ServerEvent::PlayerLeft { session_id: stale },
            );
            tracing::info!(
                room_key = %self.room_key,
                session_id = %stale,
                "evicted duplicate session"
            );
        }
    }

    fn handle_leave(&mut self, session_id: SessionId) {
        if self.registry.get(session_id).is_none() {
            // Already gone (evicted, or a duplicate leave). No-op.
            return;
        }

        self.drop_session(session_id);
        self.broadcast_except(
            session_id,
            &ServerEvent::PlayerLeft { session_id },
        );
        tracing::info!(
            room_key = %self.room_key,
            %session_id,
            occupancy = self.registry.len(),
            "session left"
        );
    }

    /// Removes every trace of a session from the room's state.
    fn drop_session(&mut self, session_id: SessionId) {
        self.registry.remove(session_id);
        self.senders.remove(&session_id);
        self.limiter.clear(session_id);
    }

    // -- Event dispatch ----------------------------------------------------

    fn handle_event(&mut self, session_id: SessionId, event: ClientEvent) {
        if !self.registry.contains(session_id) {
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                "event from unknown session, dropping"
            );
            return;
        }

        match event {
            ClientEvent::Join(_) => {
                tracing::debug!(
                    room_key = %self.room_key,
                    %session_id,
                    "join event on established session, dropping"
                );
            }
            ClientEvent::Move { x, y, z, rotation } => {
                self.on_move(session_id, x, y, z, rotation);
            }
            ClientEvent::Character { path, file } => {
                self.on_character(session_id, path, file);
            }
            ClientEvent::Chat { message } => {
                self.on_chat(session_id, message);
            }
            ClientEvent::Signal {
                target,
                kind,
                payload,
            } => {
                self.on_signal(session_id, target, kind, payload);
            }
        }
    }

    fn on_move(
        &mut self,
        session_id: SessionId,
        x: f64,
        y: f64,
        z: f64,
        rotation: f64,
    ) {
        if !(x.is_finite()
            && y.is_finite()
            && z.is_finite()
            && rotation.is_finite())
        {
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                "non-finite move coordinates, dropping"
            );
            return;
        }

        let Some(presence) = self.registry.get_mut(session_id) else {
            return;
        };
        presence.position.x = x;
        presence.position.y = y;
        presence.position.z = z;
        presence.position.rotation = rotation;

        // The mover already has authoritative local state; no echo, no ack.
        self.broadcast_except(
            session_id,
            &ServerEvent::PlayerMoved {
                session_id,
                x,
                y,
                z,
                rotation,
            },
        );
    }

    fn on_character(
        &mut self,
        session_id: SessionId,
        path: Option<String>,
        file: Option<String>,
    ) {
        let room_key = self.room_key.clone();
        let Some(presence) = self.registry.get_mut(session_id) else {
            return;
        };

        // Fields validate independently: a bad path does not block a
        // good file, and vice versa.
        let mut changed = false;
        if let Some(path) = path {
            if galerra_session::valid_character_path(&path) {
                presence.character_path = path;
                changed = true;
            } else {
                tracing::debug!(
                    %room_key,
                    %session_id,
                    %path,
                    "rejected character path, dropping field"
                );
            }
        }
        if let Some(file) = file {
            if galerra_session::valid_character_file(&file) {
                presence.character_file = file;
                changed = true;
            } else {
                tracing::debug!(
                    %room_key,
                    %session_id,
                    %file,
                    "rejected character file, dropping field"
                );
            }
        }

        if !changed {
            return;
        }

        let character_path = presence.character_path.clone();
        let character_file = presence.character_file.clone();
        self.broadcast_except(
            session_id,
            &ServerEvent::PlayerCharacter {
                session_id,
                character_path,
                character_file,
            },
        );
    }

    fn on_chat(&mut self, session_id: SessionId, message: String) {
        let trimmed = message.trim();
        if trimmed.is_empty()
            || trimmed.chars().count() > self.config.max_chat_len
        {
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                "empty or oversized chat message, dropping"
            );
            return;
        }

        if !self.limiter.allow(
            session_id,
            RateChannel::Chat,
            Instant::now(),
        ) {
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                "chat rate limit exceeded, dropping"
            );
            return;
        }

        let sender_name = match self.registry.get(session_id) {
            Some(presence) => presence.name.clone(),
            None => return,
        };

        let timestamp = now_millis();
        let entry = ChatEntry {
            id: format!("{session_id}-{timestamp}"),
            sender_id: session_id,
            sender_name,
            message: trimmed.to_string(),
            timestamp,
        };

        self.chat.push(entry.clone());
        // Chat goes to everyone, sender included: the sender needs the
        // canonical record with the assigned id and timestamp.
        self.broadcast_all(&ServerEvent::Chat(entry));
    }

    fn on_signal(
        &mut self,
        session_id: SessionId,
        target: SessionId,
        kind: SignalKind,
        payload: String,
    ) {
        if !self.limiter.allow(
            session_id,
            RateChannel::Signal,
            Instant::now(),
        ) {
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                "signal rate limit exceeded, dropping"
            );
            return;
        }

        if !self.registry.contains(target) {
            // Best-effort relay: the peer layer above retries, so a
            // vanished target is a silent drop, not an error.
            tracing::debug!(
                room_key = %self.room_key,
                %session_id,
                %target,
                "signal target not in room, dropping"
            );
            return;
        }

        self.send_to(
            target,
            RoomOutbound::Event(ServerEvent::Signal {
                from: session_id,
                kind,
                payload,
            }),
        );
    }

    // -- Delivery ----------------------------------------------------------

    /// Sends to every session in the room.
    fn broadcast_all(&self, event: &ServerEvent) {
        for sid in self.registry.session_ids() {
            self.send_to(sid, RoomOutbound::Event(event.clone()));
        }
    }

    /// Sends to every session except `excluded`.
    fn broadcast_except(&self, excluded: SessionId, event: &ServerEvent) {
        for sid in self.registry.session_ids() {
            if sid != excluded {
                self.send_to(sid, RoomOutbound::Event(event.clone()));
            }
        }
    }

    /// Sends to a single session. A dead receiver (handler task already
    /// gone) is skipped silently; one broken recipient never affects
    /// delivery to the others.
    fn send_to(&self, session_id: SessionId, msg: RoomOutbound) {
        if let Some(sender) = self.senders.get(&session_id) {
            let _ = sender.send(msg);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_key: self.room_key.clone(),
            phase: self.phase,
            occupancy: self.registry.len(),
            max_clients: self.config.max_clients,
        }
    }
}

/// Milliseconds since the Unix epoch, for chat timestamps and ids.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command channel; if it fills up, senders
/// wait, which backpressures a room that cannot keep up.
pub(crate) fn spawn_room(
    room_key: String,
    config: RoomConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let limiter = RateLimiter::new(config.chat_limit, config.signal_limit);
    let chat = ChatLog::new(config.chat_history);

    let actor = RoomActor {
        room_key: room_key.clone(),
        phase: RoomPhase::Active,
        config,
        registry: SessionRegistry::new(),
        senders: HashMap::new(),
        limiter,
        chat,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_key,
        sender: tx,
    }
}

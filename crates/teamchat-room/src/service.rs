//! The chat service: every piece of chat state, owned in one place.
//!
//! `ChatService` is plain synchronous code. The actor in `actor.rs` owns
//! one instance and feeds it commands; tests build their own instance
//! and call it directly.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use teamchat_protocol::{
    Ack, ChatMessage, ClientEvent, ConnectionId, MessageId, ServerEvent,
    TeamCode, TeamMap,
};
use teamchat_registry::{RegistryError, TeamRegistry};

use crate::session::normalize_name;
use crate::{Broadcaster, ChatConfig, Outbox, RoomError, RoomState, Session};

/// A snapshot of one room, for listings and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub code: TeamCode,
    pub member_count: usize,
    pub message_count: usize,
}

/// Owns the registry, rooms, sessions and outboxes.
pub struct ChatService {
    config: ChatConfig,
    registry: TeamRegistry,
    rooms: HashMap<TeamCode, RoomState>,
    sessions: HashMap<ConnectionId, Session>,
    broadcaster: Broadcaster,
}

impl ChatService {
    /// Creates a service around an opened registry.
    pub fn new(registry: TeamRegistry, config: ChatConfig) -> Self {
        Self {
            config,
            registry,
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            broadcaster: Broadcaster::new(),
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The team registry.
    pub fn registry(&self) -> &TeamRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------
    // Registry operations
    // -----------------------------------------------------------------

    /// Registers a team (random code, or `custom_code` if given).
    pub fn create_team(
        &mut self,
        custom_code: Option<&str>,
    ) -> Result<TeamCode, RoomError> {
        self.registry.create(custom_code).map_err(|e| match e {
            RegistryError::BlankCode => RoomError::MissingField("customCode"),
            other => RoomError::Registry(other),
        })
    }

    /// Every registered team.
    pub fn list_teams(&self) -> TeamMap {
        self.registry.list_all().clone()
    }

    // -----------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------

    /// Registers a new connection as an `Unjoined` session.
    pub fn connect(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.broadcaster.register(conn, outbox);
        self.sessions.insert(conn, Session::new(conn));
        tracing::debug!(%conn, "session opened");
    }

    /// Joins `conn` to the room for `team_code` as `name`.
    ///
    /// On success the joiner alone receives the room's history, then a
    /// join notice is appended and broadcast to every member (joiner
    /// included). On failure nothing is mutated or sent.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        team_code: Option<&str>,
        name: Option<&str>,
    ) -> Result<TeamCode, RoomError> {
        let session = self
            .sessions
            .get_mut(&conn)
            .ok_or(RoomError::UnknownConnection(conn))?;
        session.ensure_unjoined()?;

        let code = team_code
            .and_then(TeamCode::normalize)
            .ok_or(RoomError::MissingField("teamCode"))?;
        let name = normalize_name(name, self.config.max_name_len)
            .ok_or(RoomError::MissingField("name"))?;
        if self.registry.get(&code).is_none() {
            return Err(RoomError::UnknownTeam(code));
        }

        session.join(code.clone(), name.clone())?;

        let room = self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| RoomState::new(code.clone()));
        room.attach(conn);

        self.broadcaster.send_to(
            conn,
            ServerEvent::RoomHistory {
                messages: room.messages().to_vec(),
            },
        );

        let now = Utc::now();
        let notice = ChatMessage::system(
            room.next_message_id(now),
            format!("{name} joined"),
            now,
        );
        room.append(notice.clone());
        self.broadcaster.emit(room, &ServerEvent::Message(notice));

        tracing::info!(
            team = %code,
            %conn,
            %name,
            members = room.member_count(),
            "member joined"
        );
        Ok(code)
    }

    /// Posts `text` to the caller's room and broadcasts it.
    pub fn send(
        &mut self,
        conn: ConnectionId,
        text: Option<&str>,
    ) -> Result<MessageId, RoomError> {
        let session = self.sessions.get(&conn).ok_or(RoomError::NotJoined)?;
        let (code, name) = session.joined()?;

        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RoomError::EmptyMessage)?;

        let room = self.rooms.get_mut(code).ok_or(RoomError::NotJoined)?;
        let now = Utc::now();
        let message = ChatMessage::user(room.next_message_id(now), name, text, now);
        let id = message.id.clone();
        room.append(message.clone());
        self.broadcaster.emit(room, &ServerEvent::Message(message));

        tracing::debug!(team = %code, %conn, message_id = %id, "message sent");
        Ok(id)
    }

    /// Removes message `id` from the caller's room and broadcasts the
    /// deletion.
    pub fn delete(
        &mut self,
        conn: ConnectionId,
        id: Option<&str>,
    ) -> Result<(), RoomError> {
        let session = self.sessions.get(&conn).ok_or(RoomError::NotJoined)?;
        let (code, _) = session.joined()?;

        let id = id
            .filter(|id| !id.is_empty())
            .map(MessageId::new)
            .ok_or(RoomError::MissingId)?;

        let room = self.rooms.get_mut(code).ok_or(RoomError::NotJoined)?;
        if room.remove_message(&id).is_none() {
            return Err(RoomError::NotFound(id));
        }
        self.broadcaster
            .emit(room, &ServerEvent::DeleteMessage { id: id.clone() });

        tracing::debug!(team = %code, %conn, message_id = %id, "message deleted");
        Ok(())
    }

    /// Closes `conn`'s session. Safe to call for unknown or unjoined
    /// connections.
    ///
    /// If the room still has members a leave notice is appended and
    /// broadcast; if it is now empty its log is discarded.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        self.broadcaster.unregister(conn);

        let Some(mut session) = self.sessions.remove(&conn) else {
            return;
        };
        let Some((code, name)) = session.close() else {
            tracing::debug!(%conn, "unjoined session closed");
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };
        room.detach(conn);

        if room.member_count() > 0 {
            let now = Utc::now();
            let notice = ChatMessage::system(
                room.next_message_id(now),
                format!("{name} left"),
                now,
            );
            room.append(notice.clone());
            self.broadcaster.emit(room, &ServerEvent::Message(notice));
            tracing::info!(
                team = %code,
                %conn,
                %name,
                members = room.member_count(),
                "member left"
            );
        } else {
            room.clear_log();
            tracing::info!(team = %code, %conn, %name, "last member left, room log cleared");
        }
    }

    // -----------------------------------------------------------------
    // Request dispatch
    // -----------------------------------------------------------------

    /// Applies one client event and builds its ack.
    ///
    /// Failures are reported to the caller only; nothing about a failed
    /// request is broadcast.
    pub fn handle(&mut self, conn: ConnectionId, seq: u64, event: ClientEvent) -> Ack {
        let result = match event {
            ClientEvent::CreateTeam { custom_code } => self
                .create_team(custom_code.as_deref())
                .map(|code| Ack::ok(seq).with_team_code(code)),
            ClientEvent::ListTeams => Ok(Ack::ok(seq).with_teams(self.list_teams())),
            ClientEvent::JoinRoom { team_code, name } => self
                .join(conn, team_code.as_deref(), name.as_deref())
                .map(|_| Ack::ok(seq)),
            ClientEvent::SendMessage { text } => {
                self.send(conn, text.as_deref()).map(|_| Ack::ok(seq))
            }
            ClientEvent::DeleteMessage { id } => {
                self.delete(conn, id.as_deref()).map(|_| Ack::ok(seq))
            }
            // Answered by the connection handler with a pong.
            ClientEvent::Ping { .. } => Ok(Ack::ok(seq)),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(%conn, seq, error = %e, "request rejected");
            Ack::failure(seq, e)
        })
    }

    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    /// A snapshot of the room for `code`, if it was ever joined.
    pub fn room_info(&self, code: &TeamCode) -> Option<RoomInfo> {
        self.rooms.get(code).map(|room| RoomInfo {
            code: room.code().clone(),
            member_count: room.member_count(),
            message_count: room.messages().len(),
        })
    }

    /// The room for `code`, if it was ever joined.
    pub fn room(&self, code: &TeamCode) -> Option<&RoomState> {
        self.rooms.get(code)
    }

    /// The session for `conn`, if it is open.
    pub fn session(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

//! Per-room state: the message log and the set of attached connections.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use teamchat_protocol::{ChatMessage, ConnectionId, MessageId, TeamCode};

/// Length of the random part of a message id.
const ID_SUFFIX_LEN: usize = 6;

/// One room's in-memory state.
///
/// The member count is the size of `members`, so it can never drift from
/// the set of attached sessions. Created lazily on first join; when the
/// last member leaves the log is cleared but the entry is kept.
#[derive(Debug, Clone)]
pub struct RoomState {
    code: TeamCode,
    messages: Vec<ChatMessage>,
    members: BTreeSet<ConnectionId>,
}

impl RoomState {
    /// Creates an empty room for `code`.
    pub fn new(code: TeamCode) -> Self {
        Self {
            code,
            messages: Vec::new(),
            members: BTreeSet::new(),
        }
    }

    /// The room's team code.
    pub fn code(&self) -> &TeamCode {
        &self.code
    }

    /// The log, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of attached connections.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Attached connections in id order.
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.iter().copied()
    }

    /// Returns `true` if `conn` is attached.
    pub fn is_member(&self, conn: ConnectionId) -> bool {
        self.members.contains(&conn)
    }

    /// Attaches a connection. Returns `false` if it was already attached.
    pub fn attach(&mut self, conn: ConnectionId) -> bool {
        self.members.insert(conn)
    }

    /// Detaches a connection. Returns `false` if it wasn't attached.
    pub fn detach(&mut self, conn: ConnectionId) -> bool {
        self.members.remove(&conn)
    }

    /// Appends to the end of the log.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Returns `true` if a message with `id` is in the log.
    pub fn contains_message(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    /// Removes the message with `id`, keeping the order of the rest.
    pub fn remove_message(&mut self, id: &MessageId) -> Option<ChatMessage> {
        let pos = self.messages.iter().position(|m| &m.id == id)?;
        Some(self.messages.remove(pos))
    }

    /// Drops the entire log.
    pub fn clear_log(&mut self) {
        self.messages.clear();
    }

    /// Returns a fresh id of the form `<unix-millis>-<suffix>` that is not
    /// used by any message currently in the log.
    pub fn next_message_id(&self, now: DateTime<Utc>) -> MessageId {
        let mut rng = rand::rng();
        loop {
            let suffix: String = (&mut rng)
                .sample_iter(Alphanumeric)
                .take(ID_SUFFIX_LEN)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            let id = MessageId::new(format!("{}-{suffix}", now.timestamp_millis()));
            if !self.contains_message(&id) {
                return id;
            }
        }
    }
}

//! Per-connection session: the join state machine.
//!
//! ```text
//!   Unjoined ──(join)──→ Joined ──(close)──→ Closed
//!       │                                      ↑
//!       └───────────────(close)────────────────┘
//! ```
//!
//! There is no way back to `Unjoined`, and a joined session's team code
//! never changes.

use teamchat_protocol::{ConnectionId, TeamCode};

use crate::RoomError;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected but not in a room yet.
    Unjoined,

    /// Attached to the room for `team_code` as `name`.
    Joined { team_code: TeamCode, name: String },

    /// Terminal. The connection is gone.
    Closed,
}

/// The service's record of one client connection.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    state: SessionState,
}

impl Session {
    /// A new, unjoined session.
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: SessionState::Unjoined,
        }
    }

    /// The connection this session belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Fails unless the session can still join.
    pub fn ensure_unjoined(&self) -> Result<(), RoomError> {
        match &self.state {
            SessionState::Unjoined => Ok(()),
            SessionState::Joined { team_code, .. } => {
                Err(RoomError::AlreadyJoined(team_code.clone()))
            }
            SessionState::Closed => Err(RoomError::UnknownConnection(self.id)),
        }
    }

    /// `Unjoined → Joined`. Inputs must already be normalized.
    pub fn join(
        &mut self,
        team_code: TeamCode,
        name: String,
    ) -> Result<(), RoomError> {
        self.ensure_unjoined()?;
        self.state = SessionState::Joined { team_code, name };
        Ok(())
    }

    /// The room and display name, or `NotJoined`.
    pub fn joined(&self) -> Result<(&TeamCode, &str), RoomError> {
        match &self.state {
            SessionState::Joined { team_code, name } => Ok((team_code, name)),
            _ => Err(RoomError::NotJoined),
        }
    }

    /// Moves to `Closed` from any state. Returns the room and name if the
    /// session had joined one.
    pub fn close(&mut self) -> Option<(TeamCode, String)> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Joined { team_code, name } => Some((team_code, name)),
            SessionState::Unjoined | SessionState::Closed => None,
        }
    }
}

/// Trims a display name and cuts it to `max_chars` characters. Returns
/// `None` for a missing or blank name.
pub(crate) fn normalize_name(raw: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

//! Error types for the room layer.
//!
//! The `Display` text of each variant is what the client sees in a
//! failed ack, so keep it short and user-facing.

use teamchat_protocol::{ConnectionId, MessageId, TeamCode};
use teamchat_registry::RegistryError;

/// Errors that can occur while handling a chat event.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A required request field was absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// No team is registered under this code.
    #[error("team {0} not found")]
    UnknownTeam(TeamCode),

    /// The connection already joined a room; a session joins once.
    #[error("already joined team {0}")]
    AlreadyJoined(TeamCode),

    /// The request needs a joined session.
    #[error("join a team first")]
    NotJoined,

    /// The message text was empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// A delete request without a message id.
    #[error("message id is required")]
    MissingId,

    /// No message with this id in the caller's room.
    #[error("message {0} not found")]
    NotFound(MessageId),

    /// The connection was never registered with the service, or has
    /// already been closed.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// A registry operation failed (e.g. custom code already taken).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The service actor has stopped.
    #[error("chat service is unavailable")]
    Unavailable,

    /// Handling the event panicked; the service kept running.
    #[error("internal error")]
    Internal,
}

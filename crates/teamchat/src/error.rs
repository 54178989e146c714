//! Unified error type for the Teamchat server.

use teamchat_protocol::ProtocolError;
use teamchat_registry::RegistryError;
use teamchat_room::RoomError;
use teamchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TeamchatError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The team store could not be loaded.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A chat operation failed or the service is gone.
    #[error(transparent)]
    Room(#[from] RoomError),
}

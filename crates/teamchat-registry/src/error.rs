//! Error types for the registry.

use teamchat_protocol::TeamCode;

/// Errors that can occur while creating teams or touching the store.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A custom code was supplied but is empty after trimming.
    #[error("customCode is required")]
    BlankCode,

    /// A custom code was requested but a team with that code exists.
    #[error("team code {0} already exists")]
    CodeConflict(TeamCode),

    /// The store could not be read or written.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[source] std::io::Error),

    /// The store was readable but did not contain a valid team map.
    #[error("team store is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

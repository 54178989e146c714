//! Chat service configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Display names are trimmed and then cut to this many characters.
    pub max_name_len: usize,

    /// Capacity of the service actor's command channel. When full,
    /// connection handlers wait (backpressure) instead of queueing
    /// without bound.
    pub command_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_name_len: 50,
            command_buffer: 256,
        }
    }
}

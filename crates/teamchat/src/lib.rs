//! # Teamchat
//!
//! A minimal real-time team chat relay. Clients create or pick a short
//! team code, join its room under a display name, and exchange messages
//! that are broadcast to everyone currently in the room. Teams persist
//! across restarts; room logs live only while someone is connected.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use teamchat::prelude::*;
//!
//! # async fn run() -> Result<(), TeamchatError> {
//! let server = TeamchatServer::builder()
//!     .bind("127.0.0.1:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::TeamchatError;
pub use server::{TeamchatServer, TeamchatServerBuilder};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{ServerConfig, TeamchatError, TeamchatServer, TeamchatServerBuilder};
    pub use teamchat_protocol::{
        Ack, ChatMessage, ClientEvent, Codec, JsonCodec, MessageId, Request,
        ServerEvent, Team, TeamCode, TeamMap,
    };
    pub use teamchat_registry::{JsonFileStore, MemoryStore, TeamStore};
    pub use teamchat_room::{ChatConfig, RoomError, RoomInfo, ServiceHandle};
}

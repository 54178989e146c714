//! Team-code registry for Teamchat.
//!
//! The registry is the only durable state in the system: a mapping from
//! [`TeamCode`](teamchat_protocol::TeamCode) to
//! [`Team`](teamchat_protocol::Team), loaded whole at startup and written
//! through to a [`TeamStore`] on every change.
//!
//! # Key types
//!
//! - [`TeamRegistry`] — create, look up and list teams
//! - [`TeamStore`] — where the registry is persisted
//! - [`JsonFileStore`] — a pretty-printed JSON document on disk
//! - [`MemoryStore`] — in-process store for tests and throwaway servers

mod error;
mod registry;
mod store;

pub use error::RegistryError;
pub use registry::{generate_code, TeamRegistry, CODE_ALPHABET, CODE_LEN};
pub use store::{JsonFileStore, MemoryStore, TeamStore};

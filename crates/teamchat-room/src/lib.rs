//! Room membership and message broadcast for Teamchat.
//!
//! All chat state lives in one [`ChatService`]: the team registry, every
//! room's log and member set, every connection's session, and the
//! outboxes used to reach them. The service runs inside a single Tokio
//! task (actor model) so events are applied one at a time, in arrival
//! order, without locks.
//!
//! # Key types
//!
//! - [`ChatService`] — the synchronous state machine (usable directly in tests)
//! - [`ServiceHandle`] — send commands to the running service actor
//! - [`RoomState`] — one room's log and members
//! - [`Session`] / [`SessionState`] — per-connection join state
//! - [`Broadcaster`] — fan-out to room members
//! - [`ChatConfig`] — name limits and channel sizing

mod actor;
mod broadcaster;
mod config;
mod error;
mod room;
mod service;
mod session;

pub use actor::{spawn_service, ServiceHandle};
pub use broadcaster::{Broadcaster, Outbox};
pub use config::ChatConfig;
pub use error::RoomError;
pub use room::RoomState;
pub use service::{ChatService, RoomInfo};
pub use session::{Session, SessionState};

//! Wire protocol for Teamchat.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identity types** ([`TeamCode`], [`MessageId`], [`ConnectionId`]).
//! - **Records** ([`Team`], [`ChatMessage`]) shared by the registry, the
//!   room layer and the wire.
//! - **Events** ([`Request`] / [`ClientEvent`] inbound, [`ServerEvent`] /
//!   [`Ack`] outbound).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) for turning those into
//!   bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (Request / ServerEvent) → Room (chat state)
//! ```
//!
//! The protocol layer knows nothing about rooms or membership. It only
//! guarantees that every inbound frame becomes a typed [`ClientEvent`]
//! whose optional fields are validated later by the state machine.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use teamchat_transport::ConnectionId;
pub use types::{
    Ack, ChatMessage, ClientEvent, MessageId, Request, ServerEvent, Team,
    TeamCode, TeamMap,
};

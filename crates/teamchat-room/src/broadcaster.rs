//! Fan-out of server events to connections.

use std::collections::HashMap;

use teamchat_protocol::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;

use crate::RoomState;

/// Channel for delivering server events to one connection's writer task.
///
/// Unbounded so the service never waits on a slow client; a client that
/// stops reading only grows its own queue.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// Knows how to reach every connected client.
///
/// Delivery is at-most-once: an outbox whose receiver is gone is skipped
/// silently, and nothing is retried or queued for later.
#[derive(Debug, Default)]
pub struct Broadcaster {
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl Broadcaster {
    /// Creates a broadcaster with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the outbox for `conn`.
    pub fn register(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(conn, outbox);
    }

    /// Forgets `conn`. Returns `false` if it wasn't registered.
    pub fn unregister(&mut self, conn: ConnectionId) -> bool {
        self.outboxes.remove(&conn).is_some()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Delivers `event` to one connection. Returns whether it was handed
    /// to a live outbox.
    pub fn send_to(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.outboxes.get(&conn) {
            Some(outbox) => outbox.send(event).is_ok(),
            None => false,
        }
    }

    /// Delivers `event` to every member of `room`. Returns how many
    /// members it reached.
    pub fn emit(&self, room: &RoomState, event: &ServerEvent) -> usize {
        let delivered = room
            .members()
            .filter(|conn| self.send_to(*conn, event.clone()))
            .count();
        tracing::debug!(
            team = %room.code(),
            members = room.member_count(),
            delivered,
            "event broadcast"
        );
        delivered
    }
}

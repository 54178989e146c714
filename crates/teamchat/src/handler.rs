//! Per-connection handler: request routing and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection and its outbox with the chat service
//!   2. Spawn a writer task that drains the outbox onto the socket
//!   3. Loop: receive frames → decode → ping/pong or service request → ack
//!
//! Acks, pongs and broadcasts all go through the same outbox, so a client
//! sees them in the order the service produced them.

use std::sync::Arc;

use chrono::Utc;
use teamchat_protocol::{ClientEvent, Codec, ConnectionId, JsonCodec, Request, ServerEvent};
use teamchat_room::{Outbox, ServiceHandle};
use teamchat_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::TeamchatError;

/// Drop guard that closes the connection's session when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the send.
struct SessionGuard {
    conn_id: ConnectionId,
    service: ServiceHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let service = self.service.clone();
        tokio::spawn(async move {
            let _ = service.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), TeamchatError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbox, inbox) = mpsc::unbounded_channel();
    state.service.connect(conn_id, outbox.clone()).await?;
    let _guard = SessionGuard {
        conn_id,
        service: state.service.clone(),
    };

    let writer = tokio::spawn(write_loop(Arc::clone(&conn), inbox, state.codec));
    let result = read_loop(&conn, &state, &outbox).await;

    writer.abort();
    let _ = conn.close().await;
    result
    // _guard drops here → session disconnect fires.
}

async fn read_loop(
    conn: &WebSocketConnection,
    state: &ServerState,
    outbox: &Outbox,
) -> Result<(), TeamchatError> {
    let conn_id = conn.id();

    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    return Ok(());
                }
            },
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
        };

        let request: Request = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to decode request");
                let _ = outbox.send(ServerEvent::Error {
                    message: e.to_string(),
                });
                continue;
            }
        };

        let event = match request.event {
            ClientEvent::Ping { client_time } => ServerEvent::Pong {
                client_time,
                server_time: u64::try_from(Utc::now().timestamp_millis())
                    .unwrap_or_default(),
            },
            _ => ServerEvent::Ack(state.service.request(conn_id, request).await?),
        };
        if outbox.send(event).is_err() {
            return Ok(());
        }
    }
}

async fn write_loop(
    conn: Arc<WebSocketConnection>,
    mut inbox: mpsc::UnboundedReceiver<ServerEvent>,
    codec: JsonCodec,
) {
    let conn_id = conn.id();

    while let Some(event) = inbox.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

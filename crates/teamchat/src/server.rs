//! `TeamchatServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → chat service actor.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use teamchat_protocol::JsonCodec;
use teamchat_registry::{JsonFileStore, MemoryStore, TeamRegistry, TeamStore};
use teamchat_room::{spawn_service, ChatConfig, ChatService, ServiceHandle};
use teamchat_transport::{Incoming, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, TeamchatError};

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) service: ServiceHandle,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Teamchat server.
///
/// # Example
///
/// ```rust,no_run
/// use teamchat::prelude::*;
///
/// # async fn run() -> Result<(), TeamchatError> {
/// let server = TeamchatServer::builder()
///     .bind("0.0.0.0:3000")
///     .teams_file("data/teams.json")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TeamchatServerBuilder {
    config: ServerConfig,
}

impl TeamchatServerBuilder {
    /// Creates a builder with [`ServerConfig::default`] settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Persists the team registry to `path`.
    pub fn teams_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.teams_file = Some(path.into());
        self
    }

    /// Keeps the team registry in memory only.
    pub fn in_memory(mut self) -> Self {
        self.config.teams_file = None;
        self
    }

    /// Closes connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Drops sockets that have not finished the WebSocket handshake
    /// within `timeout`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the chat service configuration.
    pub fn chat_config(mut self, chat: ChatConfig) -> Self {
        self.config.chat = chat;
        self
    }

    /// Opens the configured team store, starts the chat service and binds
    /// the listener.
    ///
    /// # Errors
    /// Fails if the team file exists but cannot be read or parsed, or if
    /// the address cannot be bound.
    pub async fn build(self) -> Result<TeamchatServer, TeamchatError> {
        match self.config.teams_file.clone() {
            Some(path) => self.build_with_store(JsonFileStore::new(path)).await,
            None => self.build_with_store(MemoryStore::new()).await,
        }
    }

    /// Like [`build`](Self::build) but with a caller-supplied store.
    pub async fn build_with_store(
        self,
        store: impl TeamStore,
    ) -> Result<TeamchatServer, TeamchatError> {
        let registry = TeamRegistry::open(store)?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);
        let service = spawn_service(ChatService::new(registry, self.config.chat));

        let state = Arc::new(ServerState {
            service,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(TeamchatServer { transport, state })
    }
}

/// A bound Teamchat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TeamchatServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl TeamchatServer {
    /// Creates a new builder.
    pub fn builder() -> TeamchatServerBuilder {
        TeamchatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the chat service, for creating or listing teams
    /// without a WebSocket client.
    pub fn service(&self) -> ServiceHandle {
        self.state.service.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), TeamchatError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then closes the
    /// listener and stops the chat service.
    ///
    /// Each accepted socket finishes its WebSocket handshake in its own
    /// task, so a peer that stalls mid-handshake never holds up the loop.
    ///
    /// Connections already open are not drained; their handlers fail
    /// with [`RoomError::Unavailable`](teamchat_room::RoomError) on the
    /// next request.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TeamchatError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Teamchat server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = incoming.peer_addr();
                            let conn = match incoming.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Teamchat server shutting down");
        self.transport.shutdown().await?;
        self.state.service.shutdown().await?;
        Ok(())
    }
}
